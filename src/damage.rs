//! Damage aggregation and per-window ingest (spec §3.4, §4.5).
//!
//! Grounded on `gfx/src/damage.rs`'s `DamageTracker` (merge-on-insert bound
//! to a fixed rect count) generalized to the full `Region` union this spec
//! needs, and on `abi/src/damage.rs`'s damage-rect wire shape for what a
//! "damage part" looks like once decoded off the connection.

use crate::region::{Rect, Region};
use crate::window::WindowId;

/// Union of all per-window repair regions since the last paint (spec §3.4).
#[derive(Default)]
pub struct DamageAggregator {
    all_damage: Region,
}

impl DamageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn union_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.all_damage = self.all_damage.union_rect(rect);
    }

    pub fn union_region(&mut self, region: &Region) {
        if region.is_empty() {
            return;
        }
        self.all_damage = self.all_damage.union_into(region);
    }

    pub fn is_empty(&self) -> bool {
        self.all_damage.is_empty()
    }

    pub fn region(&self) -> &Region {
        &self.all_damage
    }

    pub fn clear(&mut self) {
        self.all_damage.clear();
    }
}

/// What the caller should do with a decoded DamageNotify for one window
/// (spec §4.5). Kept separate from I/O: the caller supplies whatever the
/// connection already handed back (either "not yet fetched" or a list of
/// already-fetched/decoded damage parts) and this function does the pure
/// region bookkeeping.
pub struct RepairWin {
    /// Region to union into the aggregator and to acknowledge against the
    /// server-side damage object (subtract, in X's damage-repair sense).
    pub repair_region: Region,
}

/// Ingest one DamageNotify. `ever_damaged` distinguishes the first-damage
/// case (repair the whole known extents, no need to fetch parts) from later
/// ones (fetch/translate the server's damage parts).
///
/// - First damage: `extents` is the repair region.
/// - Subsequent: `parts` (already fetched and decoded by the caller) are
///   translated by the window's absolute origin `(x + border_width, y +
///   border_width)` before being unioned.
pub fn repair_win(
    ever_damaged: bool,
    extents: Option<&Region>,
    parts: &[Rect],
    origin_x: i32,
    origin_y: i32,
) -> RepairWin {
    if !ever_damaged {
        let region = extents.cloned().unwrap_or_else(Region::empty);
        RepairWin {
            repair_region: region,
        }
    } else {
        let translated: Vec<Rect> = parts
            .iter()
            .map(|r| r.translated(origin_x, origin_y))
            .collect();
        RepairWin {
            repair_region: Region::create(&translated),
        }
    }
}

/// Per-window damage id bookkeeping the event demultiplexer needs alongside
/// `repair_win` (spec §4.2 destroy path: "free damage handle").
#[derive(Default)]
pub struct DamageState {
    pub ever_damaged: bool,
    pub damaged_this_frame: bool,
}

impl DamageState {
    pub fn mark_damaged(&mut self) {
        self.ever_damaged = true;
        self.damaged_this_frame = true;
    }
}

pub type DamageOwner = WindowId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_damage_uses_extents_verbatim() {
        let extents = Region::from_rect(Rect::new(0, 0, 10, 10));
        let r = repair_win(false, Some(&extents), &[], 0, 0);
        assert_eq!(r.repair_region.extents(), Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn subsequent_damage_translates_parts_by_origin() {
        let parts = [Rect::new(0, 0, 5, 5)];
        let r = repair_win(true, None, &parts, 100, 50);
        assert_eq!(r.repair_region.extents(), Rect::new(100, 50, 105, 55));
    }

    #[test]
    fn aggregator_accumulates_across_windows() {
        let mut agg = DamageAggregator::new();
        agg.union_rect(Rect::new(0, 0, 10, 10));
        agg.union_rect(Rect::new(20, 20, 30, 30));
        assert!(!agg.is_empty());
        agg.clear();
        assert!(agg.is_empty());
    }
}
