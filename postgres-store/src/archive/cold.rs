//! Cold archive store: reads/writes NDJSON segment files under a
//! directory, with no existing file-writing module to model directly, so
//! its idiom (scoped `tokio::fs` handles, wrapped errors) comes from the
//! rest of this crate instead.
//!
//! Archived events don't carry `domain`: the segment-line schema has no
//! `domain` field, and the combined feed's API takes no domain filter
//! either, so cold-sourced [`Event`]s are reconstructed with an empty
//! `domain`. This is a deliberate, documented artifact of the NDJSON
//! schema, not a bug (see DESIGN.md).

use std::path::{Path, PathBuf};

use eventlog_core::cancel::Cancel;
use eventlog_core::codec::SegmentLine;
use eventlog_core::error::Error as CoreError;
use eventlog_core::event::Event;
use eventlog_core::segment::{parse_segment_file_name, segment_file_name};
use eventlog_core::version::GlobalPosition;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::error::PgError;

/// A directory of `events-{min}-{max}.ndjson` segment files.
#[derive(Debug, Clone)]
pub struct ColdArchiveStore {
    archive_dir: PathBuf,
}

impl ColdArchiveStore {
    #[must_use]
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        ColdArchiveStore {
            archive_dir: archive_dir.into(),
        }
    }

    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Writes `events` to a new segment file covering
    /// `[min_position, max_position]`, via temp-file-then-rename. The
    /// rename is the commit point.
    ///
    /// Overwrites a file already at the target name; the segment
    /// catalog's overlap check inside the same transaction is the real
    /// safety net against that happening in practice.
    pub async fn write_segment(
        &self,
        events: &[Event],
        min_position: GlobalPosition,
        max_position: GlobalPosition,
    ) -> Result<PathBuf, CoreError> {
        self.write_segment_inner(events, min_position, max_position)
            .await
            .map_err(|err| err.into_core("write_segment", None, None))
    }

    async fn write_segment_inner(
        &self,
        events: &[Event],
        min_position: GlobalPosition,
        max_position: GlobalPosition,
    ) -> Result<PathBuf, PgError> {
        tokio::fs::create_dir_all(&self.archive_dir).await?;

        let mut body = String::new();
        for event in events {
            let line = SegmentLine::from_event(event)
                .to_line()
                .map_err(|err| PgError::Corrupt(err.to_string()))?;
            body.push_str(&line);
            body.push('\n');
        }

        let final_name = segment_file_name(min_position, max_position);
        let final_path = self.archive_dir.join(&final_name);
        let tmp_path = self.archive_dir.join(format!("{final_name}.tmp-{}", std::process::id()));

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(body.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path).await?;

        Ok(final_path)
    }

    /// Lists every `events-*.ndjson` file in the archive directory,
    /// sorted ascending by `min_position`, and yields their events in
    /// order, suppressing any with `global_position <=
    /// from_exclusive` and skipping files entirely whose `max_position
    /// <= from_exclusive` without opening them.
    pub fn read_all_forwards<'a>(
        &'a self,
        from_exclusive: Option<GlobalPosition>,
        cancel: Cancel,
    ) -> BoxStream<'a, Result<Event, CoreError>> {
        let from_exclusive = from_exclusive.unwrap_or(0);

        enum Files {
            Unlisted,
            Listed(std::vec::IntoIter<(GlobalPosition, GlobalPosition, PathBuf)>),
        }

        struct State {
            files: Files,
            buffer: std::vec::IntoIter<Event>,
        }

        let initial = State {
            files: Files::Unlisted,
            buffer: Vec::new().into_iter(),
        };

        stream::try_unfold(initial, move |mut state| {
            let cancel = cancel.clone();
            async move {
                loop {
                    if let Some(event) = state.buffer.next() {
                        return Ok(Some((event, state)));
                    }
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }

                    if matches!(state.files, Files::Unlisted) {
                        let files = self
                            .list_segment_files()
                            .await
                            .map_err(|err| err.into_core("cold_read_all_forwards", None, None))?;
                        state.files = Files::Listed(files.into_iter());
                    }

                    let Files::Listed(files) = &mut state.files else {
                        unreachable!("listed above");
                    };

                    let Some((_, max_position, path)) = files.next() else {
                        return Ok(None);
                    };
                    if max_position <= from_exclusive {
                        continue;
                    }

                    let events = read_segment_file(&path, from_exclusive)
                        .await
                        .map_err(|err| err.into_core("cold_read_all_forwards", None, None))?;

                    state.buffer = events.into_iter();
                }
            }
        })
        .boxed()
    }

    async fn list_segment_files(&self) -> Result<Vec<(GlobalPosition, GlobalPosition, PathBuf)>, PgError> {
        let mut entries = match tokio::fs::read_dir(&self.archive_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PgError::from(err)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((min_position, max_position)) = parse_segment_file_name(file_name) {
                files.push((min_position, max_position, entry.path()));
            }
        }

        files.sort_by_key(|&(min_position, _, _)| min_position);
        Ok(files)
    }
}

async fn read_segment_file(path: &Path, from_exclusive: GlobalPosition) -> Result<Vec<Event>, PgError> {
    let contents = tokio::fs::read_to_string(path).await?;

    contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = SegmentLine::from_line(line).map_err(|err| PgError::Corrupt(err.to_string()))?;
            let event = line
                .into_event(String::new())
                .map_err(|err| PgError::Corrupt(err.to_string()))?;
            Ok(event)
        })
        .filter(|event: &Result<Event, PgError>| match event {
            Ok(event) => event.global_position > from_exclusive,
            Err(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(position: GlobalPosition) -> Event {
        Event {
            global_position: position,
            domain: String::new(),
            stream_id: "s-1".to_owned(),
            version: position as u32,
            namespace: String::new(),
            event_type: "Thing".to_owned(),
            data: b"data".to_vec(),
            metadata: None,
            created_utc: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColdArchiveStore::new(dir.path());

        let events = vec![sample_event(1), sample_event(2), sample_event(3)];
        store.write_segment(&events, 1, 3).await.unwrap();

        let path = dir.path().join(segment_file_name(1, 3));
        assert!(path.exists());

        let read_back: Vec<_> = store
            .read_all_forwards(None, Cancel::never())
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(read_back.len(), 3);
        assert_eq!(read_back[0].global_position, 1);
        assert_eq!(read_back[2].global_position, 3);
    }

    #[tokio::test]
    async fn from_exclusive_skips_whole_files_and_suppresses_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColdArchiveStore::new(dir.path());

        store.write_segment(&[sample_event(1), sample_event(2)], 1, 2).await.unwrap();
        store.write_segment(&[sample_event(3), sample_event(4)], 3, 4).await.unwrap();

        let read_back: Vec<_> = store
            .read_all_forwards(Some(2), Cancel::never())
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(read_back.iter().map(|e| e.global_position).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn empty_directory_yields_no_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColdArchiveStore::new(dir.path());

        let read_back: Vec<_> = store.read_all_forwards(None, Cancel::never()).collect().await;
        assert!(read_back.is_empty());
    }
}
