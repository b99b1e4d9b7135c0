//! Combined event feed: merges a filtered cold stream with the hot
//! forward feed into one globally-ordered, duplicate-free sequence.
//!
//! Favors `Stream`-returning APIs over collected `Vec`s
//! (`eventually/src/event/store.rs`'s `Stream` type alias), built from
//! `futures::stream` combinators since there's no cold tier upstream to
//! merge against directly.

use std::pin::Pin;

use eventlog_core::cancel::Cancel;
use eventlog_core::error::Error as CoreError;
use eventlog_core::event::Event;
use eventlog_core::segment::ArchiveSegment;
use eventlog_core::version::GlobalPosition;
use futures::stream::{self, BoxStream, Peekable, StreamExt};

use crate::archive::catalog::SegmentCatalog;
use crate::archive::cold::ColdArchiveStore;
use crate::store::EventStore;

/// Merges [`ColdArchiveStore`] (via [`SegmentCatalog`]-filtered coverage)
/// and [`EventStore`]'s hot forward feed.
#[derive(Debug, Clone)]
pub struct CombinedFeed {
    cold: ColdArchiveStore,
    catalog: SegmentCatalog,
    store: EventStore,
}

impl CombinedFeed {
    #[must_use]
    pub fn new(cold: ColdArchiveStore, catalog: SegmentCatalog, store: EventStore) -> Self {
        CombinedFeed { cold, catalog, store }
    }

    /// Yields every event with `GlobalPosition > from_exclusive`, merged
    /// from cold and hot storage, strictly increasing, each position at
    /// most once.
    ///
    /// On a tie (a mid-archival window where the hot row hasn't been
    /// pruned yet) the cold-sourced event is emitted and the matching hot
    /// event is discarded, since cold is authoritative.
    #[must_use]
    pub fn read_all_forwards<'a>(
        &'a self,
        from_exclusive: Option<GlobalPosition>,
        batch_size: i64,
        cancel: Cancel,
    ) -> BoxStream<'a, Result<Event, CoreError>> {
        enum State<'a> {
            NotStarted,
            Started {
                cold: Peekable<BoxStream<'a, Result<Event, CoreError>>>,
                hot: Peekable<BoxStream<'a, Result<Event, CoreError>>>,
            },
        }

        enum Peeked {
            Empty,
            Err,
            Pos(GlobalPosition),
        }

        stream::try_unfold(State::NotStarted, move |mut state| {
            let cancel = cancel.clone();

            async move {
                if matches!(state, State::NotStarted) {
                    let segments = self.catalog.get_active_segments().await?;

                    let cold_source = self.cold.read_all_forwards(from_exclusive, cancel.clone());
                    let cold_filtered = cold_source
                        .filter(move |result| {
                            let keep = match result {
                                Ok(event) => covered_by(&segments, event.global_position),
                                Err(_) => true,
                            };
                            async move { keep }
                        })
                        .boxed();

                    let hot = self
                        .store
                        .read_all_forwards(None, None, from_exclusive.unwrap_or(0), batch_size, cancel.clone())
                        .boxed();

                    state = State::Started {
                        cold: cold_filtered.peekable(),
                        hot: hot.peekable(),
                    };
                }

                let State::Started { cold, hot } = &mut state else {
                    unreachable!("initialized above");
                };

                if cancel.is_cancelled() {
                    return Ok(None);
                }

                let cold_peek = match Pin::new(&mut *cold).peek().await {
                    None => Peeked::Empty,
                    Some(Err(_)) => Peeked::Err,
                    Some(Ok(event)) => Peeked::Pos(event.global_position),
                };
                let hot_peek = match Pin::new(&mut *hot).peek().await {
                    None => Peeked::Empty,
                    Some(Err(_)) => Peeked::Err,
                    Some(Ok(event)) => Peeked::Pos(event.global_position),
                };

                match (cold_peek, hot_peek) {
                    (Peeked::Empty, Peeked::Empty) => Ok(None),
                    (Peeked::Err, _) => Err(cold.next().await.expect("peeked Some above").unwrap_err()),
                    (_, Peeked::Err) => Err(hot.next().await.expect("peeked Some above").unwrap_err()),
                    (Peeked::Pos(_), Peeked::Empty) => {
                        let event = cold.next().await.expect("peeked Some above")?;
                        Ok(Some((event, state)))
                    }
                    (Peeked::Empty, Peeked::Pos(_)) => {
                        let event = hot.next().await.expect("peeked Some above")?;
                        Ok(Some((event, state)))
                    }
                    (Peeked::Pos(cold_pos), Peeked::Pos(hot_pos)) if cold_pos < hot_pos => {
                        let event = cold.next().await.expect("peeked Some above")?;
                        Ok(Some((event, state)))
                    }
                    (Peeked::Pos(cold_pos), Peeked::Pos(hot_pos)) if cold_pos > hot_pos => {
                        let event = hot.next().await.expect("peeked Some above")?;
                        Ok(Some((event, state)))
                    }
                    (Peeked::Pos(_), Peeked::Pos(_)) => {
                        let event = cold.next().await.expect("peeked Some above")?;
                        let _ = hot.next().await;
                        Ok(Some((event, state)))
                    }
                }
            }
        })
        .boxed()
    }
}

fn covered_by(segments: &[ArchiveSegment], position: GlobalPosition) -> bool {
    segments.iter().any(|segment| segment.covers(position))
}
