use tokio::sync::mpsc;

use super::viewport::{PageId, ViewportObserver};

/// Shown in place of a page whose image failed to load.
pub const PLACEHOLDER_IMAGE: &str = "placeholder.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevealState {
    pub has_entered_viewport: bool,
    pub is_loaded: bool,
    pub has_errored: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RevealOptions {
    /// Rows around the visible area that count as "near".
    pub margin: u16,
    /// Leading pages activated without waiting for the viewport.
    pub priority: usize,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            margin: 24,
            priority: 3,
        }
    }
}

#[derive(Debug)]
pub struct RevealUnit {
    url: String,
    state: RevealState,
    requested: bool,
}

impl RevealUnit {
    pub fn state(&self) -> RevealState {
        self.state
    }

    /// What to draw: nothing before the page is near, the placeholder after
    /// a failure, the page URL otherwise.
    pub fn source(&self) -> Option<&str> {
        if !self.state.has_entered_viewport {
            None
        } else if self.state.has_errored {
            Some(PLACEHOLDER_IMAGE)
        } else {
            Some(&self.url)
        }
    }
}

/// Per-chapter lazy loading of page images.
///
/// Every page starts hidden except the leading priority pages. The engine
/// registers the rest with a [`ViewportObserver`]; the first enter
/// notification flips the unit to entered and unregisters it. Entered pages
/// are handed out for fetching once each, and every settled fetch (success or
/// failure) bumps the loaded counter. A new chapter gets a new engine.
pub struct RevealEngine {
    chapter: String,
    units: Vec<RevealUnit>,
    loaded: usize,
    entered_rx: mpsc::UnboundedReceiver<PageId>,
}

impl RevealEngine {
    pub fn new<O: ViewportObserver>(
        chapter: impl Into<String>,
        images: Vec<String>,
        options: RevealOptions,
        observer: &mut O,
    ) -> Self {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();

        let units = images
            .into_iter()
            .enumerate()
            .map(|(i, url)| RevealUnit {
                url,
                state: RevealState {
                    has_entered_viewport: i < options.priority,
                    ..RevealState::default()
                },
                requested: false,
            })
            .collect::<Vec<_>>();

        for id in options.priority..units.len() {
            let tx = entered_tx.clone();
            observer.observe(
                id,
                options.margin,
                Box::new(move |id| {
                    let _ = tx.send(id);
                }),
            );
        }

        let mut engine = Self {
            chapter: chapter.into(),
            units,
            loaded: 0,
            entered_rx,
        };
        engine.sync(observer);
        engine
    }

    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    pub fn units(&self) -> &[RevealUnit] {
        &self.units
    }

    pub fn unit(&self, id: PageId) -> Option<&RevealUnit> {
        self.units.get(id)
    }

    pub fn total(&self) -> usize {
        self.units.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded
    }

    pub fn progress(&self) -> f64 {
        if self.units.is_empty() {
            return 0.0;
        }
        self.loaded as f64 / self.units.len() as f64
    }

    /// Applies pending enter notifications. Returns how many units entered.
    pub fn sync<O: ViewportObserver>(&mut self, observer: &mut O) -> usize {
        let mut entered = 0;
        while let Ok(id) = self.entered_rx.try_recv() {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            if unit.state.has_entered_viewport {
                continue;
            }
            unit.state.has_entered_viewport = true;
            observer.unobserve(id);
            entered += 1;
        }
        entered
    }

    /// Entered pages whose image has not been requested yet. Each page is
    /// returned once.
    pub fn take_ready_fetches(&mut self) -> Vec<(PageId, String)> {
        self.units
            .iter_mut()
            .enumerate()
            .filter(|(_, unit)| unit.state.has_entered_viewport && !unit.requested)
            .map(|(id, unit)| {
                unit.requested = true;
                (id, unit.url.clone())
            })
            .collect()
    }

    pub fn mark_loaded(&mut self, id: PageId) -> bool {
        self.settle(id, false)
    }

    pub fn mark_errored(&mut self, id: PageId) -> bool {
        self.settle(id, true)
    }

    fn settle(&mut self, id: PageId, errored: bool) -> bool {
        let Some(unit) = self.units.get_mut(id) else {
            return false;
        };
        if !unit.requested || unit.state.is_loaded {
            return false;
        }

        unit.state.is_loaded = true;
        unit.state.has_errored = errored;
        self.loaded += 1;
        true
    }
}

impl std::fmt::Debug for RevealEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealEngine")
            .field("chapter", &self.chapter)
            .field("total", &self.units.len())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::viewport::ScrollViewport;

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://img.test/{i}.jpg")).collect()
    }

    fn entered(engine: &RevealEngine) -> Vec<PageId> {
        engine
            .units()
            .iter()
            .enumerate()
            .filter(|(_, u)| u.state().has_entered_viewport)
            .map(|(i, _)| i)
            .collect()
    }

    fn viewport(slots: usize) -> ScrollViewport {
        let mut viewport = ScrollViewport::new(10, 10);
        viewport.reset(slots);
        viewport
    }

    #[test]
    fn priority_pages_start_entered() {
        let mut viewport = viewport(10);
        let engine = RevealEngine::new(
            "c1",
            images(10),
            RevealOptions {
                margin: 0,
                priority: 3,
            },
            &mut viewport,
        );
        assert_eq!(entered(&engine), [0, 1, 2]);
        assert!(!viewport.is_observing(1));
        assert!(viewport.is_observing(3));
    }

    #[test]
    fn entering_is_monotonic_and_unobserves() {
        let mut viewport = viewport(10);
        let options = RevealOptions {
            margin: 5,
            priority: 0,
        };
        let mut engine = RevealEngine::new("c1", images(10), options, &mut viewport);
        assert_eq!(entered(&engine), [0, 1]);
        assert!(!viewport.is_observing(0));

        viewport.scroll_to(30);
        assert_eq!(engine.sync(&mut viewport), 3);
        assert_eq!(entered(&engine), [0, 1, 2, 3, 4]);

        viewport.scroll_to(0);
        assert_eq!(engine.sync(&mut viewport), 0);
        assert_eq!(entered(&engine), [0, 1, 2, 3, 4]);
        assert!(!viewport.is_observing(3));
        assert!(viewport.is_observing(5));
    }

    #[test]
    fn fetches_are_handed_out_once_and_only_after_entering() {
        let mut viewport = viewport(6);
        let options = RevealOptions {
            margin: 0,
            priority: 1,
        };
        let mut engine = RevealEngine::new("c1", images(6), options, &mut viewport);

        let first: Vec<_> = engine.take_ready_fetches().into_iter().map(|(id, _)| id).collect();
        assert_eq!(first, [0]);
        assert!(engine.take_ready_fetches().is_empty());
        assert_eq!(engine.unit(5).unwrap().source(), None);

        viewport.scroll_to(50);
        engine.sync(&mut viewport);
        let next = engine.take_ready_fetches();
        assert_eq!(next, [(5, "https://img.test/5.jpg".to_string())]);
    }

    #[test]
    fn counter_tracks_settled_units_for_any_interleaving() {
        let mut viewport = viewport(4);
        let options = RevealOptions {
            margin: 100,
            priority: 0,
        };
        let mut engine = RevealEngine::new("c1", images(4), options, &mut viewport);
        engine.take_ready_fetches();

        assert!(engine.mark_errored(2));
        assert!(engine.mark_loaded(0));
        assert!(!engine.mark_loaded(2));
        assert!(!engine.mark_errored(0));
        assert!(engine.mark_loaded(3));
        assert!(!engine.mark_loaded(42));

        let settled = engine
            .units()
            .iter()
            .filter(|u| u.state().is_loaded)
            .count();
        assert_eq!(engine.loaded_count(), settled);
        assert_eq!(engine.loaded_count(), 3);
        assert!((engine.progress() - 0.75).abs() < f64::EPSILON);

        let failed = engine.unit(2).unwrap();
        assert!(failed.state().has_errored);
        assert_eq!(failed.source(), Some(PLACEHOLDER_IMAGE));
        assert_eq!(engine.unit(0).unwrap().source(), Some("https://img.test/0.jpg"));
    }

    #[test]
    fn events_before_request_are_ignored() {
        let mut viewport = viewport(4);
        let options = RevealOptions {
            margin: 0,
            priority: 0,
        };
        let mut engine = RevealEngine::new("c1", images(4), options, &mut viewport);
        assert!(!engine.mark_loaded(3));
        assert_eq!(engine.loaded_count(), 0);
    }

    #[test]
    fn new_chapter_starts_from_zero() {
        let mut viewport = viewport(2);
        let mut engine = RevealEngine::new("c1", images(2), RevealOptions::default(), &mut viewport);
        engine.take_ready_fetches();
        engine.mark_loaded(0);
        assert_eq!(engine.loaded_count(), 1);

        viewport.reset(3);
        let engine = RevealEngine::new("c2", images(3), RevealOptions::default(), &mut viewport);
        assert_eq!(engine.chapter(), "c2");
        assert_eq!(engine.loaded_count(), 0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn empty_chapter_has_zero_progress() {
        let mut viewport = viewport(0);
        let engine = RevealEngine::new("c1", Vec::new(), RevealOptions::default(), &mut viewport);
        assert_eq!(engine.total(), 0);
        assert_eq!(engine.progress(), 0.0);
    }
}
