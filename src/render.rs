//! Two-phase painter (spec §4.7): opaque bottom-up, then shadow/translucent
//! top-down, finished by a blit of the off-screen buffer to the target.
//!
//! Grounded on the teacher's two-pass renderer in
//! `userland/src/apps/compositor/renderer.rs` (content pass then chrome/
//! overlay pass over the same framebuffer) — the same bottom-up-then-
//! top-down shape, generalized here to opaque-vs-translucent instead of
//! content-vs-chrome and driven by the planner's `PaintEntry` list instead
//! of a fixed two-layer model.

use crate::backend::{CompositeOp, RendererBackend};
use crate::paint::PaintEntry;
use crate::region::{Rect, Region};
use crate::window::{Mode, PictureId, Window};
use crate::window_table::WindowTable;

/// The five frame-opacity bands a window with an active carve-out is split
/// into (spec §4.7).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Band {
    Top,
    Left,
    Bottom,
    Right,
    Body,
}

/// Geometric destination rectangle for each band, in root coordinates:
/// four border strips sized by `frame_extents`, inset to not overlap at the
/// corners (top/bottom run the full width; left/right fill the band between
/// them), and an interior body rectangle.
fn frame_band_rects(win: &Window) -> [(Band, Rect); 5] {
    let g = win.geometry;
    let fe = win.frame_extents;
    let x0 = g.x;
    let y0 = g.y;
    let x1 = g.x + g.widthb() as i32;
    let y1 = g.y + g.heightb() as i32;

    let top = fe.top.clamp(0, (y1 - y0).max(0));
    let bottom = fe.bottom.clamp(0, (y1 - y0 - top).max(0));
    let left = fe.left.clamp(0, (x1 - x0).max(0));
    let right = fe.right.clamp(0, (x1 - x0 - left).max(0));

    [
        (Band::Top, Rect::new(x0, y0, x1, y0 + top)),
        (Band::Bottom, Rect::new(x0, y1 - bottom, x1, y1)),
        (Band::Left, Rect::new(x0, y0 + top, x0 + left, y1 - bottom)),
        (Band::Right, Rect::new(x1 - right, y0 + top, x1, y1 - bottom)),
        (Band::Body, Rect::new(x0 + left, y0 + top, x1 - right, y1 - bottom)),
    ]
}

/// Paint one frame given the planner's output, the root tile, and an
/// off-screen buffer picture to composite into.
pub fn paint_frame(
    windows: &mut WindowTable,
    entries: &[PaintEntry],
    buffer: PictureId,
    repaint_region: &Region,
    root_tile: PictureId,
    target: PictureId,
    backend: &mut impl RendererBackend,
) {
    let mut remaining = repaint_region.clone();

    // Phase A: opaque bottom-up (entries are in top-down order; walk
    // reversed).
    for entry in entries.iter().rev() {
        if entry.mode != Mode::Solid {
            continue;
        }
        let Some(win) = windows.find_any(entry.window) else {
            continue;
        };
        let Some(picture) = win.textures.picture else {
            continue;
        };
        if remaining.is_empty() {
            break;
        }
        backend.composite(
            CompositeOp::Src,
            picture,
            None,
            buffer,
            win.geometry.x,
            win.geometry.y,
            &remaining,
        );
        if let Some(border_size) = &win.border_size {
            remaining = remaining.subtract_into(border_size);
        }
    }
    if !remaining.is_empty() {
        backend.composite(CompositeOp::Src, root_tile, None, buffer, 0, 0, &remaining);
    }

    // Phase B: shadow and translucent/ARGB top-down, in `prev_trans` chain
    // order (already the order `entries` is in).
    for entry in entries {
        let Some(win) = windows.find_any_mut(entry.window) else {
            continue;
        };
        let clip = win.border_clip.clone().unwrap_or_else(Region::empty);

        // An empty clip here means "nothing of this window is visible this
        // frame" (it's fully covered by `reg_ignore`), not "unclipped" —
        // skip straight past both the shadow and content composites.
        if clip.is_empty() {
            win.border_clip = None;
            continue;
        }

        if let Some(shadow_picture) = win.textures.shadow_picture {
            let black = shadow_source(backend);
            backend.composite(
                CompositeOp::Over,
                black,
                Some(shadow_picture),
                buffer,
                win.geometry.x + win.textures.shadow_dx,
                win.geometry.y + win.textures.shadow_dy,
                &clip,
            );
            backend.free_picture(black);
        }

        let has_carveout = win.has_frame_opacity_carveout();
        if entry.mode != Mode::Solid || has_carveout {
            let Some(content) = win.textures.picture else {
                win.border_clip = None;
                continue;
            };
            if has_carveout {
                for (band, rect) in frame_band_rects(win) {
                    if rect.is_empty() {
                        continue;
                    }
                    let band_clip = clip.intersect_into(&Region::from_rect(rect));
                    if band_clip.is_empty() {
                        continue;
                    }
                    let mask = match band {
                        Band::Body => win.textures.alpha_mask_body,
                        _ => win.textures.alpha_mask_frame,
                    };
                    backend.composite(
                        CompositeOp::Over,
                        content,
                        mask,
                        buffer,
                        win.geometry.x,
                        win.geometry.y,
                        &band_clip,
                    );
                }
            } else {
                backend.composite(
                    CompositeOp::Over,
                    content,
                    win.textures.alpha_mask_body,
                    buffer,
                    win.geometry.x,
                    win.geometry.y,
                    &clip,
                );
            }
        }

        win.border_clip = None;
    }

    backend.composite(CompositeOp::Src, buffer, None, target, 0, 0, repaint_region);
}

fn shadow_source(backend: &mut impl RendererBackend) -> PictureId {
    backend.create_repeating_1x1_picture(crate::backend::Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Rgba8;
    use crate::region::Rect;
    use crate::window::{Geometry, Window};

    #[derive(Default)]
    struct RecordingBackend {
        composites: Vec<(CompositeOp, PictureId, Option<PictureId>, PictureId)>,
        next_id: PictureId,
    }

    impl RendererBackend for RecordingBackend {
        fn create_repeating_1x1_picture(&mut self, _color: Rgba8) -> PictureId {
            self.next_id += 1;
            self.next_id
        }
        fn create_picture_over_drawable(&mut self, _pixmap: u32, _has_alpha: bool) -> PictureId {
            self.next_id += 1;
            self.next_id
        }
        fn composite(
            &mut self,
            op: CompositeOp,
            src: PictureId,
            mask: Option<PictureId>,
            dst: PictureId,
            _dx: i32,
            _dy: i32,
            _clip: &Region,
        ) {
            self.composites.push((op, src, mask, dst));
        }
        fn free_picture(&mut self, _picture: PictureId) {}
        fn create_pixmap(&mut self, _w: u32, _h: u32, _depth: u8) -> u32 {
            self.next_id += 1;
            self.next_id
        }
        fn free_pixmap(&mut self, _pixmap: u32) {}
        fn upload_alpha8_image(&mut self, _pixmap: u32, _w: u32, _h: u32, _alpha: &[u8]) {}
    }

    #[test]
    fn opaque_window_paints_with_src_then_translucent_paints_with_over() {
        let mut table = WindowTable::new();
        let mut win = Window::new(1, false);
        win.geometry = Geometry {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            border_width: 0,
        };
        win.mode = Mode::Solid;
        win.textures.picture = Some(42);
        win.border_size = Some(Region::from_rect(Rect::new(0, 0, 10, 10)));
        table.insert_after(win, None);

        let entries = vec![crate::paint::PaintEntry {
            window: 1,
            mode: Mode::Solid,
            reg_ignore: Region::empty(),
        }];
        let mut backend = RecordingBackend::default();
        let repaint = Region::from_rect(Rect::new(0, 0, 10, 10));
        paint_frame(&mut table, &entries, 1, &repaint, 2, 3, &mut backend);

        assert!(backend
            .composites
            .iter()
            .any(|(op, src, _, dst)| *op == CompositeOp::Src && *src == 42 && *dst == 1));
    }
}
