use std::collections::BTreeMap;

pub type PageId = usize;
pub type EnterCallback = Box<dyn FnMut(PageId) + Send>;

/// Viewport proximity detection.
///
/// `on_enter` is called when `target` comes within `margin` rows of the
/// visible area, and may be called again on later checks until the caller
/// `unobserve`s the target.
pub trait ViewportObserver {
    fn observe(&mut self, target: PageId, margin: u16, on_enter: EnterCallback);
    fn unobserve(&mut self, target: PageId);
}

struct Watch {
    margin: u16,
    on_enter: EnterCallback,
}

/// Pages stacked as a vertical strip of equal slots, scrolled by rows.
pub struct ScrollViewport {
    slot_height: u16,
    scroll_top: u32,
    height: u16,
    slots: usize,
    watched: BTreeMap<PageId, Watch>,
}

impl ScrollViewport {
    pub fn new(slot_height: u16, height: u16) -> Self {
        Self {
            slot_height: slot_height.max(1),
            scroll_top: 0,
            height,
            slots: 0,
            watched: BTreeMap::new(),
        }
    }

    /// Forgets all observations and returns to the top for a new strip.
    pub fn reset(&mut self, slots: usize) {
        self.watched.clear();
        self.scroll_top = 0;
        self.slots = slots;
    }

    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    pub fn slot_height(&self) -> u16 {
        self.slot_height
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_observing(&self, target: PageId) -> bool {
        self.watched.contains_key(&target)
    }

    fn max_scroll(&self) -> u32 {
        let content = self.slots as u32 * self.slot_height as u32;
        content.saturating_sub(self.height as u32)
    }

    pub fn scroll_to(&mut self, row: u32) {
        self.scroll_top = row.min(self.max_scroll());
        self.check();
    }

    pub fn scroll_by(&mut self, rows: i64) {
        let row = (self.scroll_top as i64 + rows).max(0) as u32;
        self.scroll_to(row);
    }

    /// Updates the geometry; a no-op when nothing changed.
    pub fn resize(&mut self, height: u16, slot_height: u16) {
        let slot_height = slot_height.max(1);
        if height == self.height && slot_height == self.slot_height {
            return;
        }

        // Keep the page at the top of the screen in place.
        let top_slot = self.scroll_top / self.slot_height as u32;
        self.height = height;
        self.slot_height = slot_height;
        self.scroll_to(top_slot * slot_height as u32);
    }

    /// Slots that intersect the visible rows, with their first visible row
    /// relative to the slot top.
    pub fn visible_slots(&self) -> Vec<(PageId, i64)> {
        let top = self.scroll_top as i64;
        let bottom = top + self.height as i64;
        let slot = self.slot_height as i64;

        (0..self.slots)
            .filter_map(|id| {
                let start = id as i64 * slot;
                (start < bottom && start + slot > top).then_some((id, start - top))
            })
            .collect()
    }

    fn is_near(&self, target: PageId, margin: u16) -> bool {
        let slot = self.slot_height as i64;
        let start = target as i64 * slot;
        let end = start + slot;
        let top = self.scroll_top as i64 - margin as i64;
        let bottom = self.scroll_top as i64 + self.height as i64 + margin as i64;
        start < bottom && end > top
    }

    /// Notifies every observed target currently within its margin.
    pub fn check(&mut self) {
        let near: Vec<PageId> = self
            .watched
            .iter()
            .filter(|(id, watch)| self.is_near(**id, watch.margin))
            .map(|(id, _)| *id)
            .collect();

        for id in near {
            if let Some(watch) = self.watched.get_mut(&id) {
                (watch.on_enter)(id);
            }
        }
    }
}

impl ViewportObserver for ScrollViewport {
    fn observe(&mut self, target: PageId, margin: u16, on_enter: EnterCallback) {
        self.slots = self.slots.max(target + 1);
        let mut watch = Watch { margin, on_enter };
        if self.is_near(target, margin) {
            (watch.on_enter)(target);
        }
        self.watched.insert(target, watch);
    }

    fn unobserve(&mut self, target: PageId) {
        self.watched.remove(&target);
    }
}
