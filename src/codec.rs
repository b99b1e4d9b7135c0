//! The NDJSON segment-line wire format: one JSON object per line,
//! camelCase fields, base64 payloads, RFC 3339 timestamps.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::event::Event;
use crate::version::{GlobalPosition, Version};

/// One line of a segment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLine {
    pub global_position: GlobalPosition,
    pub stream_id: String,
    pub stream_version: Version,
    pub stream_namespace: String,
    pub event_type: String,
    pub created_utc: String,
    pub data: Option<String>,
    pub metadata: Option<String>,
}

impl SegmentLine {
    /// Encodes a persisted [`Event`] into its NDJSON line shape.
    ///
    /// `domain` isn't part of the wire schema, so it isn't carried here;
    /// it is recovered by the caller from the enclosing stream/segment
    /// context.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        SegmentLine {
            global_position: event.global_position,
            stream_id: event.stream_id.clone(),
            stream_version: event.version,
            stream_namespace: event.namespace.clone(),
            event_type: event.event_type.clone(),
            created_utc: event.created_utc.to_rfc3339_opts(SecondsFormat::Micros, true),
            data: Some(BASE64.encode(&event.data)),
            metadata: event.metadata.as_deref().map(|m| BASE64.encode(m)),
        }
    }

    /// Decodes this line back into an [`Event`], given the `domain` it
    /// belongs to (supplied by the reader from the enclosing segment's
    /// stream context, since the cold archive reader in `eventlog-postgres`
    /// tracks domain separately from the line itself).
    pub fn into_event(self, domain: String) -> Result<Event, Error> {
        let created_utc: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.created_utc)
            .map_err(|err| Error::Validation(format!("invalid createdUtc '{}': {err}", self.created_utc)))?
            .with_timezone(&Utc);

        let data = match self.data {
            Some(encoded) => BASE64
                .decode(encoded)
                .map_err(|err| Error::Validation(format!("invalid base64 data: {err}")))?,
            None => Vec::new(),
        };

        let metadata = self
            .metadata
            .map(|encoded| {
                BASE64
                    .decode(encoded)
                    .map_err(|err| Error::Validation(format!("invalid base64 metadata: {err}")))
            })
            .transpose()?;

        Ok(Event {
            global_position: self.global_position,
            domain,
            stream_id: self.stream_id,
            version: self.stream_version,
            namespace: self.stream_namespace,
            event_type: self.event_type,
            data,
            metadata,
            created_utc,
        })
    }

    /// Serializes this line to a single NDJSON line (no trailing newline).
    pub fn to_line(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| Error::Validation(format!("failed to encode segment line: {err}")))
    }

    /// Parses a single NDJSON line.
    pub fn from_line(line: &str) -> Result<Self, Error> {
        serde_json::from_str(line).map_err(|err| Error::Validation(format!("failed to decode segment line: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event {
            global_position: 42,
            domain: "orders".to_owned(),
            stream_id: "o-1".to_owned(),
            version: 3,
            namespace: "eu".to_owned(),
            event_type: "OrderPlaced".to_owned(),
            data: b"hello".to_vec(),
            metadata: Some(b"meta".to_vec()),
            created_utc: "2024-05-01T12:00:00.123456Z".parse().unwrap(),
        }
    }

    #[test]
    fn round_trips_identical_envelope_fields() {
        let event = sample_event();
        let line = SegmentLine::from_event(&event);
        let encoded = line.to_line().unwrap();

        let decoded_line = SegmentLine::from_line(&encoded).unwrap();
        let decoded = decoded_line.into_event(event.domain.clone()).unwrap();

        assert_eq!(decoded.stream_id, event.stream_id);
        assert_eq!(decoded.version, event.version);
        assert_eq!(decoded.global_position, event.global_position);
        assert_eq!(decoded.event_type, event.event_type);
        assert_eq!(decoded.namespace, event.namespace);
        assert_eq!(decoded.data, event.data);
        assert_eq!(decoded.metadata, event.metadata);
        assert_eq!(decoded.created_utc, event.created_utc);
    }

    #[test]
    fn null_data_and_metadata_round_trip_as_empty() {
        let mut event = sample_event();
        event.metadata = None;

        let line = SegmentLine::from_event(&event);
        assert!(line.metadata.is_none());

        let decoded = line.into_event(event.domain.clone()).unwrap();
        assert_eq!(decoded.metadata, None);
    }

    #[test]
    fn line_is_camel_cased_json_with_no_trailing_comma() {
        let line = SegmentLine::from_event(&sample_event());
        let encoded = line.to_line().unwrap();

        assert!(encoded.contains("\"globalPosition\""));
        assert!(encoded.contains("\"streamId\""));
        assert!(encoded.contains("\"streamVersion\""));
        assert!(encoded.contains("\"streamNamespace\""));
        assert!(encoded.contains("\"eventType\""));
        assert!(encoded.contains("\"createdUtc\""));
        assert!(!encoded.trim_end().ends_with(','));
    }
}
