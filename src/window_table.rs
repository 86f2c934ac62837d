//! The ordered stacking list of managed windows (spec §3.1, §4.2) and the
//! invariants tying it to the live X server.
//!
//! The teacher's linked list (`prev`/intrusive pointers are absent; instead
//! it keeps a `BTreeMap<u32, SurfaceState>` plus a `z_order: u32` field per
//! entry, re-sorting on overflow — see `normalize_z_order` in
//! `video/src/compositor_context.rs`). Design Notes §9 calls the analogous
//! C original's intrusive singly-linked list out for re-architecture and
//! suggests exactly this shape: "an ordered map keyed by X window id with a
//! secondary stacking vector". `restack_win` below is the only function
//! that reorders that vector, matching the invariant in spec §3.1.

use std::collections::HashMap;

use crate::window::{Window, WindowId};

pub struct WindowTable {
    windows: HashMap<WindowId, Window>,
    /// Bottom-to-top stacking order, mirroring the X server's child order.
    stacking: Vec<WindowId>,
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowTable {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            stacking: Vec::new(),
        }
    }

    /// Lookup that skips destroyed entries (spec §3.1: "lookups skip
    /// destroyed entries") so a recycled window id can't resolve to a
    /// lingering fade-out husk.
    pub fn find(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id).filter(|w| !w.destroyed)
    }

    pub fn find_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id).filter(|w| !w.destroyed)
    }

    /// Lookup that does *not* skip destroyed entries — used by the fade
    /// scheduler and painter, which must still touch a destroyed window
    /// until its fade-out resolves.
    pub fn find_any(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn find_any_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    /// Insert a newly created window directly above `after` in the stacking
    /// order (`None` means at the very bottom), matching CreateNotify's
    /// `prev` sibling semantics (spec §4.3).
    pub fn insert_after(&mut self, window: Window, after: Option<WindowId>) {
        let id = window.id;
        self.windows.insert(id, window);
        let pos = match after {
            Some(sibling) => self
                .stacking
                .iter()
                .position(|&w| w == sibling)
                .map(|i| i + 1)
                .unwrap_or(self.stacking.len()),
            None => 0,
        };
        self.stacking.insert(pos, id);
    }

    /// Unlink and drop a window entirely (spec §4.2: destroy-completion).
    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        self.stacking.retain(|&w| w != id);
        self.windows.remove(&id)
    }

    /// The only function that moves a node within the stacking order (spec
    /// §3.1 invariant). Moves `id` to sit directly above `sibling`, or to
    /// the bottom when `sibling` is `None`.
    pub fn restack_win(&mut self, id: WindowId, sibling: Option<WindowId>) {
        if !self.stacking.contains(&id) {
            return;
        }
        self.stacking.retain(|&w| w != id);
        let pos = match sibling {
            Some(s) => self
                .stacking
                .iter()
                .position(|&w| w == s)
                .map(|i| i + 1)
                .unwrap_or(self.stacking.len()),
            None => 0,
        };
        self.stacking.insert(pos, id);
    }

    pub fn restack_top(&mut self, id: WindowId) {
        if !self.stacking.contains(&id) {
            return;
        }
        self.stacking.retain(|&w| w != id);
        self.stacking.push(id);
    }

    pub fn restack_bottom(&mut self, id: WindowId) {
        self.restack_win(id, None);
    }

    /// Bottom-to-top order, including destroyed-but-fading windows (the
    /// painter still needs to render them).
    pub fn stacking_order(&self) -> &[WindowId] {
        &self.stacking
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.stacking.iter().filter_map(|id| self.windows.get(id))
    }

    /// Safe mutable walk: snapshot the id order, then fetch each window.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Window)) {
        for id in self.stacking.clone() {
            if let Some(w) = self.windows.get_mut(&id) {
                f(w);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Window;

    fn w(id: WindowId) -> Window {
        Window::new(id, false)
    }

    #[test]
    fn insert_after_sibling_orders_correctly() {
        let mut t = WindowTable::new();
        t.insert_after(w(1), None);
        t.insert_after(w(2), Some(1));
        t.insert_after(w(3), Some(1));
        // Order: 1, 3, 2 (3 inserted directly above 1, pushing 2 up)
        assert_eq!(t.stacking_order(), &[1, 3, 2]);
    }

    #[test]
    fn restack_top_moves_to_end() {
        let mut t = WindowTable::new();
        t.insert_after(w(1), None);
        t.insert_after(w(2), Some(1));
        t.insert_after(w(3), Some(2));
        t.restack_top(1);
        assert_eq!(t.stacking_order(), &[2, 3, 1]);
    }

    #[test]
    fn restack_bottom_moves_to_start() {
        let mut t = WindowTable::new();
        t.insert_after(w(1), None);
        t.insert_after(w(2), Some(1));
        t.restack_bottom(2);
        assert_eq!(t.stacking_order(), &[2, 1]);
    }

    #[test]
    fn find_skips_destroyed() {
        let mut t = WindowTable::new();
        t.insert_after(w(1), None);
        t.find_any_mut(1).unwrap().destroyed = true;
        assert!(t.find(1).is_none());
        assert!(t.find_any(1).is_some());
    }

    #[test]
    fn remove_drops_from_stacking_and_map() {
        let mut t = WindowTable::new();
        t.insert_after(w(1), None);
        t.insert_after(w(2), Some(1));
        t.remove(1);
        assert_eq!(t.stacking_order(), &[2]);
        assert!(t.find_any(1).is_none());
    }
}
