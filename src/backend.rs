//! Renderer backend collaborator contract (spec §6.2).
//!
//! The painter never binds to a specific rendering API; it only requires
//! this small vocabulary of operations. A real binary wires an `x11rb`
//! XRender implementation of this trait; tests use an in-memory fake that
//! just records the calls it received, mirroring how the teacher tests its
//! `SurfaceBackend` trait in `video/src/compositor_context.rs`.

use crate::region::Region;
use crate::window::{PictureId, PixmapId};

/// Composite operator (spec §4.7: "source" for Phase A replace-style
/// blits, "over" for Phase B translucent/shadow layers).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompositeOp {
    Src,
    Over,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub trait RendererBackend {
    /// A picture that repeats a solid 1×1 fill of `color`, used for the
    /// shadow's source color and as a fallback root tile (spec §4.8).
    fn create_repeating_1x1_picture(&mut self, color: Rgba8) -> PictureId;

    /// Wrap `pixmap` in a picture suitable as a composite source/destination.
    fn create_picture_over_drawable(&mut self, pixmap: PixmapId, has_alpha: bool) -> PictureId;

    /// `dst = op(src, mask) clipped to region`, with `src`/`dst` translated
    /// by `(dx, dy)` relative to `dst`'s origin. `mask` is an optional alpha
    /// mask picture (body or frame alpha masks, spec §4.7).
    #[allow(clippy::too_many_arguments)]
    fn composite(
        &mut self,
        op: CompositeOp,
        src: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        dx: i32,
        dy: i32,
        clip: &Region,
    );

    fn free_picture(&mut self, picture: PictureId);

    fn create_pixmap(&mut self, width: u32, height: u32, depth: u8) -> PixmapId;

    fn free_pixmap(&mut self, pixmap: PixmapId);

    /// Upload an 8-bit alpha image (spec §4.9's shadow raster) into `pixmap`.
    fn upload_alpha8_image(&mut self, pixmap: PixmapId, width: u32, height: u32, alpha: &[u8]);
}
