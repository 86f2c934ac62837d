//! Paint planner ("preprocess", spec §4.6): decides which windows are
//! paintable this frame, their composite mode, the running ignore-region
//! each one clips against, and the top-down paint-order chain.
//!
//! Grounded on the teacher's per-frame "preprocess" step in
//! `userland/src/apps/compositor/mod.rs`, which also does a bottom-up pass
//! to decide visibility before a render pass — generalized here into the
//! two explicit passes (bottom-up decide, top-down reg_ignore + chain) the
//! spec requires, since the teacher's single-pass version doesn't need an
//! opaque-region carve-out.

use crate::region::{Rect, Region};
use crate::window::{Mode, Window, WindowId, WindowState};
use crate::window_table::WindowTable;

/// Per-type configuration the planner needs (spec §6.3 `wintype_shadow`).
pub trait PlannerPolicy {
    fn is_blacklisted(&self, window: &Window) -> bool;
    fn shadow_enabled(&self, window: &Window) -> bool;
}

/// One paintable window's plan for this frame.
#[derive(Clone, Debug)]
pub struct PaintEntry {
    pub window: WindowId,
    pub mode: Mode,
    /// Snapshot of the running opaque-coverage set *not including this
    /// window's own contribution* (spec §4.6).
    pub reg_ignore: Region,
}

/// Screen bounds the planner uses for the off-screen visibility test (spec
/// §4.6: "off-screen (x+w<1 ∨ y+h<1 ∨ x≥W ∨ y≥H)").
#[derive(Copy, Clone)]
pub struct ScreenBounds {
    pub width: i32,
    pub height: i32,
}

fn is_offscreen(win: &Window, screen: ScreenBounds) -> bool {
    let g = win.geometry;
    g.x + g.widthb() as i32 <= 0
        || g.y + g.heightb() as i32 <= 0
        || g.x >= screen.width
        || g.y >= screen.height
}

fn is_effectively_transparent(win: &Window) -> bool {
    win.opacity.current == 0
}

fn has_no_content(win: &Window) -> bool {
    win.state == WindowState::Unmapped && win.textures.picture.is_none()
}

/// Compute (or reuse) `border_size`/`extents` for a window that's about to
/// be painted (spec §4.6: "build border_size if missing; build extents if
/// missing").
fn ensure_derived_regions(win: &mut Window, shadow_enabled: bool, shadow_rect: Option<Rect>) {
    if win.border_size.is_none() {
        let window_rect = win.geometry.rect();
        let region = match &win.bounding_shape {
            Some(shape) => shape.intersect_into(&Region::from_rect(window_rect)),
            None => Region::from_rect(window_rect),
        };
        win.border_size = Some(region);
    }
    if win.extents.is_none() {
        let mut extents = win.border_size.clone().unwrap_or_else(Region::empty);
        if shadow_enabled {
            if let Some(rect) = shadow_rect {
                extents = extents.union_rect(rect);
            }
        }
        win.extents = Some(extents);
    }
}

/// Run the planner for one frame. Returns the paintable windows in top-down
/// order (the painter's Phase B walk order, equal to the `prev_trans`
/// chain); Phase A of the painter instead reverses this list for its
/// bottom-up pass.
pub fn plan_paint(
    windows: &mut WindowTable,
    screen: ScreenBounds,
    policy: &impl PlannerPolicy,
) -> Vec<PaintEntry> {
    let stacking: Vec<WindowId> = windows.stacking_order().to_vec();

    // Pass 1 (bottom-up): decide `to_paint`, refresh mode/derived regions.
    let mut to_paint: Vec<WindowId> = Vec::new();
    for &id in &stacking {
        let Some(win) = windows.find_any_mut(id) else {
            continue;
        };
        if !win.ever_damaged
            || is_offscreen(win, screen)
            || has_no_content(win)
            || is_effectively_transparent(win)
        {
            win.prev_trans = None;
            continue;
        }
        if policy.is_blacklisted(win) {
            win.prev_trans = None;
            continue;
        }

        win.mode = if win.textures.alpha_mask_body.is_some() {
            Mode::Argb
        } else if win.opacity.current < crate::window::OPAQUE {
            Mode::Trans
        } else {
            Mode::Solid
        };

        let shadow_enabled = policy.shadow_enabled(win);
        let shadow_rect = if shadow_enabled {
            Some(Rect::from_xywh(
                win.geometry.x + win.textures.shadow_dx,
                win.geometry.y + win.textures.shadow_dy,
                win.textures.shadow_width as i32,
                win.textures.shadow_height as i32,
            ))
        } else {
            None
        };
        ensure_derived_regions(win, shadow_enabled, shadow_rect);

        to_paint.push(id);
    }

    // Pass 2 (reverse, i.e. top-down): build the running `reg_ignore` and the
    // `prev_trans` chain.
    let mut running = Region::empty();
    let mut prev: Option<WindowId> = None;
    let mut entries = Vec::with_capacity(to_paint.len());
    for &id in to_paint.iter().rev() {
        let win = windows.find_any_mut(id).expect("planned window vanished");
        win.prev_trans = prev;
        // Clip this window's own paint to what isn't already covered by a
        // fully opaque window above it (spec §4.6's `reg_ignore` carve-out).
        let own_extent = win.extents.clone().unwrap_or_else(Region::empty);
        win.border_clip = Some(own_extent.subtract_into(&running));
        entries.push(PaintEntry {
            window: id,
            mode: win.mode,
            reg_ignore: running.clone(),
        });
        if win.is_fully_opaque() {
            if let Some(border_size) = &win.border_size {
                running = running.union_into(border_size);
            }
        }
        prev = Some(id);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{Geometry, Window};

    struct AllowAll;
    impl PlannerPolicy for AllowAll {
        fn is_blacklisted(&self, _window: &Window) -> bool {
            false
        }
        fn shadow_enabled(&self, _window: &Window) -> bool {
            false
        }
    }

    fn damaged_window(id: WindowId, x: i32, y: i32, w: u32, h: u32) -> Window {
        let mut win = Window::new(id, false);
        win.geometry = Geometry {
            x,
            y,
            width: w,
            height: h,
            border_width: 0,
        };
        win.ever_damaged = true;
        win
    }

    #[test]
    fn offscreen_window_is_skipped() {
        let mut table = WindowTable::new();
        table.insert_after(damaged_window(1, -1000, -1000, 10, 10), None);
        let entries = plan_paint(
            &mut table,
            ScreenBounds {
                width: 800,
                height: 600,
            },
            &AllowAll,
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn chain_order_matches_stacking_order_top_down() {
        let mut table = WindowTable::new();
        table.insert_after(damaged_window(1, 0, 0, 100, 100), None);
        table.insert_after(damaged_window(2, 0, 0, 100, 100), Some(1));
        table.insert_after(damaged_window(3, 0, 0, 100, 100), Some(2));
        let entries = plan_paint(
            &mut table,
            ScreenBounds {
                width: 800,
                height: 600,
            },
            &AllowAll,
        );
        let order: Vec<WindowId> = entries.iter().map(|e| e.window).collect();
        assert_eq!(order, vec![3, 2, 1]);
        assert_eq!(table.find(3).unwrap().prev_trans, None);
        assert_eq!(table.find(2).unwrap().prev_trans, Some(3));
        assert_eq!(table.find(1).unwrap().prev_trans, Some(2));
    }

    #[test]
    fn solid_window_adds_to_reg_ignore_for_windows_below() {
        let mut table = WindowTable::new();
        table.insert_after(damaged_window(1, 0, 0, 100, 100), None);
        table.insert_after(damaged_window(2, 0, 0, 100, 100), Some(1));
        table.find_any_mut(2).unwrap().mode = Mode::Solid;
        let entries = plan_paint(
            &mut table,
            ScreenBounds {
                width: 800,
                height: 600,
            },
            &AllowAll,
        );
        let below = entries.iter().find(|e| e.window == 1).unwrap();
        assert!(!below.reg_ignore.is_empty());
    }
}
