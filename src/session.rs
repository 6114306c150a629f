//! Edit sessions and thumbnail fan-out.
//!
//! An [`EditSession`] owns everything one editing pass needs: the source
//! image, the downscaled copy used for filmstrip thumbnails, the shared
//! [`ThumbnailSet`], the currently selected filter with its full-size
//! preview, and a [`CancelToken`].
//!
//! ## Fan-out
//!
//! [`fan_out`] applies every requested filter to the thumbnail source:
//!
//! ```text
//! NoFilters  ──(sync, no engine)──────────┐
//! CISepiaTone ──┐                         │
//! CIPixellate ──┼─ rayon par_iter ─ merge ─┼─► ThumbnailSet ─► Filtered events
//! ...         ──┘                         │
//!                                         └─► Complete (exactly once)
//! ```
//!
//! Each unit merges into the set as soon as it finishes, in whatever order
//! the pool completes them, and emits a [`FanOutEvent::Filtered`]. After every
//! unit has been attempted a single [`FanOutEvent::Complete`] follows. Failed
//! filters leave their slot empty. A unit whose slot is already filled, as
//! on a second fan-out over the same session, is neither merged nor reported.
//!
//! Once the session is cancelled, finished work is dropped on the floor: no
//! merge and no `Filtered` event. Running transforms are not interrupted.
//! `Complete` still fires, flagged `cancelled`. The cancel flag is flipped
//! and read under the same locks that guard session state, so nothing is
//! written after [`EditSession::end`] returns.

use crate::catalog::Filter;
use crate::imaging::{ImageEngine, ImagingError, apply_filter, downscale};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared cancellation flag for one session.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Filter thumbnails keyed by display identifier.
///
/// Safe to insert into from many workers and to read at any time, including
/// while fan-out is still running. Each key is written at most once.
#[derive(Debug, Default)]
pub struct ThumbnailSet {
    entries: Mutex<BTreeMap<String, Arc<DynamicImage>>>,
}

impl ThumbnailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a thumbnail unless `cancel` has fired. An already populated key
    /// keeps its first image.
    ///
    /// The flag is checked while the map is locked, so once [`close`] has
    /// returned no merge can land.
    ///
    /// [`close`]: ThumbnailSet::close
    pub fn merge(
        &self,
        key: String,
        image: Arc<DynamicImage>,
        cancel: &CancelToken,
    ) -> Merge {
        let mut entries = lock(&self.entries);
        if cancel.is_cancelled() {
            return Merge::Cancelled;
        }
        if entries.contains_key(&key) {
            return Merge::Occupied;
        }
        entries.insert(key, image);
        Merge::Inserted
    }

    /// Fire `cancel` with the map locked, waiting out any merge in progress.
    pub fn close(&self, cancel: &CancelToken) {
        let _entries = lock(&self.entries);
        cancel.cancel();
    }

    pub fn get(&self, key: &str) -> Option<Arc<DynamicImage>> {
        lock(&self.entries).get(key).cloned()
    }

    /// Thumbnail for a catalog entry, or `None` while it is still pending
    /// (or if its filter failed).
    pub fn for_filter(&self, filter: Filter) -> Option<Arc<DynamicImage>> {
        self.get(&filter.display_identifier())
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of every populated entry.
    pub fn snapshot(&self) -> BTreeMap<String, Arc<DynamicImage>> {
        lock(&self.entries).clone()
    }
}

/// What [`ThumbnailSet::merge`] did with a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Inserted,
    /// The key already had a thumbnail; the new one was dropped.
    Occupied,
    /// The session had ended; nothing was written.
    Cancelled,
}

/// Progress notifications from a fan-out.
#[derive(Debug, Clone)]
pub enum FanOutEvent {
    /// One filter finished. `error` is set when it failed.
    Filtered {
        filter: Filter,
        error: Option<String>,
    },
    /// Every filter has been attempted. Sent exactly once per fan-out.
    Complete(FanOutReport),
}

/// Summary of one fan-out invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutReport {
    /// Thumbnails merged by this invocation.
    pub populated: usize,
    pub failed: Vec<(Filter, String)>,
    pub cancelled: bool,
}

/// State for one editing pass over a single photo.
#[derive(Debug)]
pub struct EditSession {
    source: Arc<DynamicImage>,
    thumbnail_source: Arc<DynamicImage>,
    thumbnails: ThumbnailSet,
    selection: Mutex<Selection>,
    cancel: CancelToken,
}

#[derive(Debug, Clone)]
struct Selection {
    filter: Filter,
    preview: Arc<DynamicImage>,
}

impl EditSession {
    /// Start a session. Thumbnails are rendered from a copy of `source`
    /// whose longer edge is at most `thumbnail_max_edge` (0 = full size).
    pub fn new(source: DynamicImage, thumbnail_max_edge: u32) -> Self {
        let source = Arc::new(source);
        let thumbnail_source = if thumbnail_max_edge == 0 {
            Arc::clone(&source)
        } else {
            Arc::new(downscale(&source, thumbnail_max_edge))
        };
        Self {
            selection: Mutex::new(Selection {
                filter: Filter::NoFilters,
                preview: Arc::clone(&source),
            }),
            source,
            thumbnail_source,
            thumbnails: ThumbnailSet::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn source(&self) -> &Arc<DynamicImage> {
        &self.source
    }

    pub fn thumbnail_source(&self) -> &Arc<DynamicImage> {
        &self.thumbnail_source
    }

    pub fn thumbnails(&self) -> &ThumbnailSet {
        &self.thumbnails
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// End the session. In-flight work finishes but no longer touches state.
    pub fn end(&self) {
        let _selection = lock(&self.selection);
        self.thumbnails.close(&self.cancel);
    }

    pub fn is_ended(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn selected_filter(&self) -> Filter {
        lock(&self.selection).filter
    }

    /// The image the editor currently shows, with the selected filter applied.
    pub fn preview(&self) -> Arc<DynamicImage> {
        Arc::clone(&lock(&self.selection).preview)
    }

    /// Apply `filter` to the full-size source and make it the preview.
    ///
    /// Identity restores the unfiltered source. On failure the previous
    /// preview and selection stay as they were. A result that arrives after
    /// the session ended is discarded.
    pub fn select(
        &self,
        engine: &impl ImageEngine,
        filter: Filter,
    ) -> Result<Arc<DynamicImage>, ImagingError> {
        let preview = if filter.is_identity() {
            Arc::clone(&self.source)
        } else {
            Arc::new(apply_filter(engine, &self.source, filter)?)
        };
        let mut selection = lock(&self.selection);
        if !self.is_ended() {
            *selection = Selection {
                filter,
                preview: Arc::clone(&preview),
            };
        }
        Ok(preview)
    }

    fn merge(&self, filter: Filter, image: Arc<DynamicImage>) -> Merge {
        self.thumbnails.merge(filter.display_identifier(), image, &self.cancel)
    }
}

fn notify(events: Option<&Sender<FanOutEvent>>, event: FanOutEvent) {
    if let Some(tx) = events {
        // A dropped receiver means nobody is watching; the work still counts.
        let _ = tx.send(event);
    }
}

/// Render a thumbnail for every filter in `filters` into the session's
/// [`ThumbnailSet`].
///
/// Blocks until all units have been attempted. Non-identity filters run on
/// the global rayon pool.
pub fn fan_out(
    engine: &impl ImageEngine,
    session: &EditSession,
    filters: &[Filter],
    events: Option<&Sender<FanOutEvent>>,
) -> FanOutReport {
    let source = session.thumbnail_source();
    let mut populated = 0;

    // Identity needs no engine: merge it before any worker starts.
    if filters.iter().any(|f| f.is_identity())
        && session.merge(Filter::NoFilters, Arc::clone(source)) == Merge::Inserted
    {
        populated += 1;
        notify(
            events,
            FanOutEvent::Filtered {
                filter: Filter::NoFilters,
                error: None,
            },
        );
    }

    let outcomes: Vec<(Filter, Result<(), String>)> = filters
        .par_iter()
        .filter(|f| !f.is_identity())
        .filter_map(|&filter| {
            let outcome = match apply_filter(engine, source, filter) {
                Ok(image) => match session.merge(filter, Arc::new(image)) {
                    Merge::Inserted => {
                        notify(events, FanOutEvent::Filtered { filter, error: None });
                        Ok(())
                    }
                    Merge::Occupied => {
                        log::debug!("{filter} thumbnail already present");
                        return None;
                    }
                    Merge::Cancelled => {
                        log::debug!("session ended, dropping {filter} thumbnail");
                        return None;
                    }
                },
                Err(_) if session.is_ended() => {
                    log::debug!("session ended, dropping {filter} failure");
                    return None;
                }
                Err(e) => {
                    log::debug!("thumbnail {filter} failed: {e}");
                    let message = e.to_string();
                    notify(
                        events,
                        FanOutEvent::Filtered {
                            filter,
                            error: Some(message.clone()),
                        },
                    );
                    Err(message)
                }
            };
            Some((filter, outcome))
        })
        .collect();

    let mut failed = Vec::new();
    for (filter, outcome) in outcomes {
        match outcome {
            Ok(()) => populated += 1,
            Err(message) => failed.push((filter, message)),
        }
    }
    failed.sort_by_key(|(filter, _)| filter.index());

    let report = FanOutReport {
        populated,
        failed,
        cancelled: session.is_ended(),
    };
    notify(events, FanOutEvent::Complete(report.clone()));
    report
}

/// Run [`fan_out`] on a background thread.
///
/// Progress arrives on `events`; joining the handle yields the same report
/// carried by the `Complete` event.
pub fn spawn_fan_out<E>(
    engine: Arc<E>,
    session: Arc<EditSession>,
    filters: Vec<Filter>,
    events: Option<Sender<FanOutEvent>>,
) -> JoinHandle<FanOutReport>
where
    E: ImageEngine + Send + 'static,
{
    std::thread::spawn(move || fan_out(engine.as_ref(), &session, &filters, events.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustEngine;
    use crate::imaging::backend::tests::MockEngine;
    use image::{Rgba, RgbaImage};
    use std::sync::mpsc;
    use std::time::Duration;

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(24, 16, |x, y| {
            Rgba([(x * 10) as u8, (y * 15) as u8, 90, 255])
        }))
    }

    fn drain(rx: mpsc::Receiver<FanOutEvent>) -> (Vec<(Filter, Option<String>)>, Vec<FanOutReport>) {
        let mut filtered = Vec::new();
        let mut complete = Vec::new();
        for event in rx {
            match event {
                FanOutEvent::Filtered { filter, error } => filtered.push((filter, error)),
                FanOutEvent::Complete(report) => complete.push(report),
            }
        }
        (filtered, complete)
    }

    // =========================================================================
    // ThumbnailSet
    // =========================================================================

    #[test]
    fn thumbnail_set_writes_each_key_once() {
        let set = ThumbnailSet::new();
        let cancel = CancelToken::new();
        let first = Arc::new(DynamicImage::new_rgba8(1, 1));
        let second = Arc::new(DynamicImage::new_rgba8(2, 2));
        assert_eq!(set.merge("Noir".into(), Arc::clone(&first), &cancel), Merge::Inserted);
        assert_eq!(set.merge("Noir".into(), second, &cancel), Merge::Occupied);
        assert!(Arc::ptr_eq(&set.get("Noir").unwrap(), &first));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn thumbnail_set_concurrent_merges_lose_nothing() {
        let set = ThumbnailSet::new();
        let cancel = CancelToken::new();
        let img = Arc::new(DynamicImage::new_rgba8(1, 1));
        std::thread::scope(|s| {
            for t in 0..8 {
                let (set, cancel) = (&set, &cancel);
                let img = Arc::clone(&img);
                s.spawn(move || {
                    for i in 0..50 {
                        set.merge(format!("{t}-{i}"), Arc::clone(&img), cancel);
                        let _ = set.snapshot();
                    }
                });
            }
        });
        assert_eq!(set.len(), 400);
    }

    #[test]
    fn merge_after_close_writes_nothing() {
        let set = ThumbnailSet::new();
        let cancel = CancelToken::new();
        let img = Arc::new(DynamicImage::new_rgba8(1, 1));
        assert_eq!(set.merge("Mono".into(), Arc::clone(&img), &cancel), Merge::Inserted);
        assert_eq!(set.merge("Mono".into(), Arc::clone(&img), &cancel), Merge::Occupied);
        set.close(&cancel);
        assert!(cancel.is_cancelled());
        assert_eq!(set.merge("Noir".into(), img, &cancel), Merge::Cancelled);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn pending_entries_read_as_absent() {
        let set = ThumbnailSet::new();
        assert!(set.is_empty());
        assert!(set.for_filter(Filter::SepiaTone).is_none());
    }

    // =========================================================================
    // Fan-out
    // =========================================================================

    #[test]
    fn fan_out_covers_whole_catalog() {
        let session = EditSession::new(test_image(), 0);
        let (tx, rx) = mpsc::channel();
        let report = fan_out(&RustEngine::new(), &session, &Filter::ALL, Some(&tx));
        drop(tx);

        assert_eq!(report.populated, Filter::ALL.len());
        assert!(report.failed.is_empty());
        assert!(!report.cancelled);
        assert_eq!(session.thumbnails().len(), Filter::ALL.len());
        for filter in Filter::ALL {
            assert!(session.thumbnails().for_filter(filter).is_some(), "{filter:?}");
        }

        let (filtered, complete) = drain(rx);
        assert_eq!(filtered.len(), Filter::ALL.len());
        assert_eq!(complete, vec![report]);
    }

    #[test]
    fn identity_thumbnail_is_the_source() {
        let session = EditSession::new(test_image(), 0);
        fan_out(&MockEngine::new(), &session, &Filter::ALL, None);
        let identity = session.thumbnails().for_filter(Filter::NoFilters).unwrap();
        assert!(Arc::ptr_eq(&identity, session.thumbnail_source()));
        assert_eq!(identity.as_bytes(), test_image().as_bytes());
    }

    #[test]
    fn identity_never_reaches_engine() {
        let engine = MockEngine::new();
        let session = EditSession::new(test_image(), 0);
        fan_out(&engine, &session, &Filter::ALL, None);
        let constructed = engine.get_constructed();
        assert_eq!(constructed.len(), Filter::ALL.len() - 1);
        assert!(!constructed.iter().any(|n| n == "NoFilters"));
    }

    #[test]
    fn failures_leave_slots_empty_and_complete_once() {
        let engine = MockEngine::failing(&["CISepiaTone"], &["CIVignette"]);
        let session = EditSession::new(test_image(), 0);
        let (tx, rx) = mpsc::channel();
        let report = fan_out(&engine, &session, &Filter::ALL, Some(&tx));
        drop(tx);

        assert_eq!(report.populated, Filter::ALL.len() - 2);
        let failed: Vec<Filter> = report.failed.iter().map(|(f, _)| *f).collect();
        assert_eq!(failed, vec![Filter::SepiaTone, Filter::Vignette]);
        assert!(session.thumbnails().for_filter(Filter::SepiaTone).is_none());
        assert!(session.thumbnails().for_filter(Filter::Vignette).is_none());

        let (filtered, complete) = drain(rx);
        assert_eq!(filtered.len(), Filter::ALL.len());
        assert_eq!(filtered.iter().filter(|(_, e)| e.is_some()).count(), 2);
        assert_eq!(complete.len(), 1);
    }

    #[test]
    fn fan_out_over_subset() {
        let session = EditSession::new(test_image(), 0);
        let report = fan_out(
            &MockEngine::new(),
            &session,
            &[Filter::PhotoEffectMono, Filter::ColorInvert],
            None,
        );
        assert_eq!(report.populated, 2);
        assert!(session.thumbnails().for_filter(Filter::NoFilters).is_none());
    }

    #[test]
    fn cancelled_session_merges_nothing_but_still_completes() {
        let session = EditSession::new(test_image(), 0);
        session.end();
        let (tx, rx) = mpsc::channel();
        let report = fan_out(&MockEngine::new(), &session, &Filter::ALL, Some(&tx));
        drop(tx);

        assert!(report.cancelled);
        assert_eq!(report.populated, 0);
        assert!(session.thumbnails().is_empty());
        let (filtered, complete) = drain(rx);
        assert!(filtered.is_empty());
        assert_eq!(complete.len(), 1);
    }

    #[test]
    fn complete_is_the_last_event_when_units_finish_out_of_order() {
        let session = EditSession::new(test_image(), 0);
        let (tx, rx) = mpsc::channel();
        let report = fan_out(&MockEngine::staggered(), &session, &Filter::ALL, Some(&tx));
        drop(tx);

        let events: Vec<FanOutEvent> = rx.into_iter().collect();
        assert_eq!(events.len(), Filter::ALL.len() + 1);
        let completes = events
            .iter()
            .filter(|e| matches!(e, FanOutEvent::Complete(_)))
            .count();
        assert_eq!(completes, 1);
        match events.last() {
            Some(FanOutEvent::Complete(last)) => assert_eq!(last, &report),
            other => panic!("expected Complete last, got {other:?}"),
        }
        assert_eq!(session.thumbnails().len(), Filter::ALL.len());
    }

    #[test]
    fn repeat_fan_out_reports_nothing_new() {
        let engine = MockEngine::new();
        let session = EditSession::new(test_image(), 0);
        fan_out(&engine, &session, &Filter::ALL, None);
        let before = session.thumbnails().snapshot();

        let (tx, rx) = mpsc::channel();
        let report = fan_out(&engine, &session, &Filter::ALL, Some(&tx));
        drop(tx);

        assert_eq!(report.populated, 0);
        assert!(report.failed.is_empty());
        let (filtered, complete) = drain(rx);
        assert!(filtered.is_empty());
        assert_eq!(complete, vec![report]);
        // First results stay in place.
        for (key, image) in session.thumbnails().snapshot() {
            assert!(Arc::ptr_eq(&image, &before[&key]), "{key}");
        }
    }

    #[test]
    fn end_waits_for_a_merge_in_progress() {
        let session = Arc::new(EditSession::new(test_image(), 0));
        // Stand in for a worker halfway through a merge.
        let entries = lock(&session.thumbnails.entries);
        let ender = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.end())
        };
        std::thread::sleep(Duration::from_millis(30));
        assert!(!session.is_ended());
        drop(entries);
        ender.join().unwrap();
        assert!(session.is_ended());
        assert_eq!(
            session.merge(Filter::SepiaTone, Arc::new(test_image())),
            Merge::Cancelled
        );
    }

    #[test]
    fn ending_mid_fan_out_freezes_thumbnails() {
        let session = Arc::new(EditSession::new(test_image(), 0));
        let (tx, rx) = mpsc::channel();
        let handle = spawn_fan_out(
            Arc::new(MockEngine::staggered()),
            Arc::clone(&session),
            Filter::ALL.to_vec(),
            Some(tx),
        );
        std::thread::sleep(Duration::from_millis(5));
        session.end();
        let at_end = session.thumbnails().snapshot();

        let report = handle.join().unwrap();
        assert!(report.cancelled);
        let after = session.thumbnails().snapshot();
        assert_eq!(after.keys().collect::<Vec<_>>(), at_end.keys().collect::<Vec<_>>());

        let (filtered, complete) = drain(rx);
        assert_eq!(filtered.len(), at_end.len());
        assert_eq!(complete.len(), 1);
    }

    #[test]
    fn thumbnails_use_downscaled_source() {
        let session = EditSession::new(DynamicImage::new_rgba8(400, 200), 100);
        fan_out(&RustEngine::new(), &session, &Filter::ALL, None);
        let thumb = session.thumbnails().for_filter(Filter::PhotoEffectNoir).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 50));
        assert_eq!(session.source().width(), 400);
    }

    #[test]
    fn spawned_fan_out_reports_through_handle_and_channel() {
        let session = Arc::new(EditSession::new(test_image(), 0));
        let (tx, rx) = mpsc::channel();
        let handle = spawn_fan_out(
            Arc::new(RustEngine::new()),
            Arc::clone(&session),
            Filter::ALL.to_vec(),
            Some(tx),
        );
        let (filtered, complete) = drain(rx);
        let report = handle.join().unwrap();

        assert_eq!(filtered.len(), Filter::ALL.len());
        assert_eq!(complete, vec![report]);
        assert_eq!(session.thumbnails().len(), Filter::ALL.len());
    }

    // =========================================================================
    // Full-image selection
    // =========================================================================

    #[test]
    fn select_updates_preview() {
        let session = EditSession::new(test_image(), 0);
        let preview = session.select(&RustEngine::new(), Filter::ColorInvert).unwrap();
        assert_eq!(session.selected_filter(), Filter::ColorInvert);
        assert!(Arc::ptr_eq(&session.preview(), &preview));
        assert_ne!(preview.as_bytes(), session.source().as_bytes());
    }

    #[test]
    fn select_identity_restores_source() {
        let session = EditSession::new(test_image(), 0);
        session.select(&RustEngine::new(), Filter::SepiaTone).unwrap();
        session.select(&RustEngine::new(), Filter::NoFilters).unwrap();
        assert!(Arc::ptr_eq(&session.preview(), session.source()));
    }

    #[test]
    fn failed_select_keeps_previous_preview() {
        let session = EditSession::new(test_image(), 0);
        let before = session.select(&MockEngine::new(), Filter::ColorInvert).unwrap();

        let engine = MockEngine::failing(&[], &["CISepiaTone"]);
        let result = session.select(&engine, Filter::SepiaTone);
        assert!(matches!(result, Err(ImagingError::NoOutput(_))));
        assert_eq!(session.selected_filter(), Filter::ColorInvert);
        assert!(Arc::ptr_eq(&session.preview(), &before));
    }

    #[test]
    fn end_waits_for_a_selection_in_progress() {
        let session = Arc::new(EditSession::new(test_image(), 0));
        let selection = lock(&session.selection);
        let ender = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.end())
        };
        std::thread::sleep(Duration::from_millis(30));
        assert!(!session.is_ended());
        drop(selection);
        ender.join().unwrap();

        session.select(&MockEngine::new(), Filter::ColorInvert).unwrap();
        assert_eq!(session.selected_filter(), Filter::NoFilters);
    }

    #[test]
    fn select_after_end_leaves_state_alone() {
        let session = EditSession::new(test_image(), 0);
        session.end();
        session.select(&MockEngine::new(), Filter::ColorInvert).unwrap();
        assert_eq!(session.selected_filter(), Filter::NoFilters);
    }
}
