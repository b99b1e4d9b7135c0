//! Archive segment records and segment filename encoding/parsing.

use crate::version::GlobalPosition;

/// `Active` is the only status currently produced; other values are
/// reserved for future segment lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum SegmentStatus {
    /// The segment's file exists and its events are visible through the
    /// combined feed.
    Active = 1,
}

impl SegmentStatus {
    #[must_use]
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(SegmentStatus::Active),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

/// A catalog row describing one archived, contiguous position range.
///
/// Active segments have pairwise-disjoint `[min_position, max_position]`
/// ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSegment {
    /// Assigned identifier.
    pub segment_id: i64,
    /// Inclusive lower bound of the archived position range.
    pub min_position: GlobalPosition,
    /// Inclusive upper bound of the archived position range.
    pub max_position: GlobalPosition,
    /// Path of the segment file, relative to the archive directory.
    pub file_name: String,
    /// The segment's lifecycle status.
    pub status: SegmentStatus,
    /// The archived events' namespace, if uniform.
    pub stream_namespace: Option<String>,
}

impl ArchiveSegment {
    /// Whether `position` falls within this segment's covered range.
    #[must_use]
    pub fn covers(&self, position: GlobalPosition) -> bool {
        self.min_position <= position && position <= self.max_position
    }

    /// Whether this segment's range overlaps `[min_position, max_position]`.
    #[must_use]
    pub fn overlaps(&self, min_position: GlobalPosition, max_position: GlobalPosition) -> bool {
        self.min_position <= max_position && self.max_position >= min_position
    }
}

/// Builds the segment file name for a given inclusive position range:
/// `events-{min:016}-{max:016}.ndjson`.
#[must_use]
pub fn segment_file_name(min_position: GlobalPosition, max_position: GlobalPosition) -> String {
    format!("events-{min_position:016}-{max_position:016}.ndjson")
}

/// Parses `(min_position, max_position)` back out of a segment file name
/// produced by [`segment_file_name`]. Returns `None` for anything that
/// doesn't match the `events-{16 digits}-{16 digits}.ndjson` shape.
#[must_use]
pub fn parse_segment_file_name(file_name: &str) -> Option<(GlobalPosition, GlobalPosition)> {
    let stem = file_name.strip_prefix("events-")?.strip_suffix(".ndjson")?;
    let (min_str, max_str) = stem.split_once('-')?;

    if min_str.len() != 16 || max_str.len() != 16 {
        return None;
    }

    let min_position = min_str.parse().ok()?;
    let max_position = max_str.parse().ok()?;
    Some((min_position, max_position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_round_trips() {
        let name = segment_file_name(6, 3000);
        assert_eq!(name, "events-0000000000000006-0000000000003000.ndjson");
        assert_eq!(parse_segment_file_name(&name), Some((6, 3000)));
    }

    #[test]
    fn rejects_unrelated_file_names() {
        assert_eq!(parse_segment_file_name("events-123.ndjson"), None);
        assert_eq!(parse_segment_file_name("other.ndjson"), None);
        assert_eq!(parse_segment_file_name("events-0000000000000006-0000000000003000.json"), None);
    }

    #[test]
    fn overlap_detection() {
        let seg = ArchiveSegment {
            segment_id: 1,
            min_position: 10,
            max_position: 20,
            file_name: segment_file_name(10, 20),
            status: SegmentStatus::Active,
            stream_namespace: None,
        };

        assert!(seg.overlaps(15, 25));
        assert!(seg.overlaps(1, 10));
        assert!(!seg.overlaps(21, 30));
        assert!(!seg.overlaps(1, 9));
        assert!(seg.covers(10));
        assert!(seg.covers(20));
        assert!(!seg.covers(21));
    }
}
