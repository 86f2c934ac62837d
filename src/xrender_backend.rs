//! The `x11rb`/XRender implementation of [`crate::backend::RendererBackend`]
//! (spec §6.2). Kept as a thin adapter: every method is a direct XRender
//! request, with no state beyond the connection and the picture format ids
//! it needs to pick for alpha-only vs RGBA drawables.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::render::{
    self, Color, ConnectionExt as _, PictOp, Pictformat, Repeat,
};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::backend::{CompositeOp, RendererBackend, Rgba8};
use crate::region::Region;
use crate::window::{PictureId, PixmapId};

fn composite_op(op: CompositeOp) -> PictOp {
    match op {
        CompositeOp::Src => PictOp::SRC,
        CompositeOp::Over => PictOp::OVER,
    }
}

pub struct XRenderBackend<'a> {
    conn: &'a RustConnection,
    drawable_root: u32,
    argb32: Pictformat,
    a8: Pictformat,
}

impl<'a> XRenderBackend<'a> {
    pub fn new(conn: &'a RustConnection, drawable_root: u32) -> Result<Self> {
        let formats = conn.render_query_pict_formats()?.reply()?;
        let argb32 = pick_standard_format(&formats, render::PictType::DIRECT, 32)
            .expect("server must advertise a 32-bit ARGB picture format");
        let a8 = pick_standard_format(&formats, render::PictType::DIRECT, 8)
            .expect("server must advertise an 8-bit alpha picture format");
        Ok(Self {
            conn,
            drawable_root,
            argb32,
            a8,
        })
    }

    fn clip_region(&self, picture: PictureId, region: &Region) {
        let rects: Vec<xproto::Rectangle> = region
            .fetch_rects()
            .iter()
            .map(|r| xproto::Rectangle {
                x: r.x0 as i16,
                y: r.y0 as i16,
                width: r.width() as u16,
                height: r.height() as u16,
            })
            .collect();
        let _ = self
            .conn
            .render_set_picture_clip_rectangles(picture, 0, 0, &rects);
    }

    /// Reset `picture`'s clip to "unclipped" (`CPClipMask = None`), so a
    /// clip set for one composite never leaks into the next.
    fn clear_clip(&self, picture: PictureId) {
        let _ = self
            .conn
            .render_change_picture(picture, &render::ChangePictureAux::new().clip_mask(0));
    }
}

fn pick_standard_format(
    formats: &render::QueryPictFormatsReply,
    pict_type: render::PictType,
    depth: u8,
) -> Option<Pictformat> {
    formats
        .formats
        .iter()
        .find(|f| f.type_ == pict_type && f.depth == depth)
        .map(|f| f.id)
}

impl RendererBackend for XRenderBackend<'_> {
    fn create_repeating_1x1_picture(&mut self, color: Rgba8) -> PictureId {
        let pixmap = self.create_pixmap(1, 1, 32);
        let gc = self.conn.generate_id().expect("id exhausted");
        let _ = self
            .conn
            .create_gc(gc, pixmap, &xproto::CreateGCAux::new());
        let render_color = Color {
            red: (color.r as u16) << 8,
            green: (color.g as u16) << 8,
            blue: (color.b as u16) << 8,
            alpha: (color.a as u16) << 8,
        };
        let picture = self.conn.generate_id().expect("id exhausted");
        let _ = self.conn.render_create_picture(
            picture,
            pixmap,
            self.argb32,
            &render::CreatePictureAux::new().repeat(Repeat::NORMAL),
        );
        let _ = self.conn.render_fill_rectangles(
            PictOp::SRC,
            picture,
            render_color,
            &[xproto::Rectangle {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            }],
        );
        let _ = self.conn.free_gc(gc);
        picture
    }

    fn create_picture_over_drawable(&mut self, pixmap: PixmapId, has_alpha: bool) -> PictureId {
        let format = if has_alpha { self.argb32 } else { self.argb32 };
        let picture = self.conn.generate_id().expect("id exhausted");
        let _ = self
            .conn
            .render_create_picture(picture, pixmap, format, &render::CreatePictureAux::new());
        picture
    }

    fn composite(
        &mut self,
        op: CompositeOp,
        src: PictureId,
        mask: Option<PictureId>,
        dst: PictureId,
        dx: i32,
        dy: i32,
        clip: &Region,
    ) {
        // An empty clip means "no clip region was computed", not "clip to
        // zero pixels" — composite the full drawable and let the server
        // clamp width/height to the destination's actual size.
        let (width, height) = if clip.is_empty() {
            (u16::MAX, u16::MAX)
        } else {
            self.clip_region(dst, clip);
            let extents = clip.extents();
            (extents.width().max(1) as u16, extents.height().max(1) as u16)
        };
        let _ = self.conn.render_composite(
            composite_op(op),
            src,
            mask.unwrap_or(0),
            dst,
            0,
            0,
            0,
            0,
            dx as i16,
            dy as i16,
            width,
            height,
        );
        if !clip.is_empty() {
            self.clear_clip(dst);
        }
    }

    fn free_picture(&mut self, picture: PictureId) {
        let _ = self.conn.render_free_picture(picture);
    }

    fn create_pixmap(&mut self, width: u32, height: u32, depth: u8) -> PixmapId {
        let pixmap = self.conn.generate_id().expect("id exhausted");
        let _ = self.conn.create_pixmap(
            depth,
            pixmap,
            self.drawable_root,
            width.max(1) as u16,
            height.max(1) as u16,
        );
        pixmap
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        let _ = self.conn.free_pixmap(pixmap);
    }

    fn upload_alpha8_image(&mut self, pixmap: PixmapId, width: u32, height: u32, alpha: &[u8]) {
        let gc = self.conn.generate_id().expect("id exhausted");
        let _ = self
            .conn
            .create_gc(gc, pixmap, &xproto::CreateGCAux::new());
        let _ = self.conn.put_image(
            xproto::ImageFormat::Z_PIXMAP,
            pixmap,
            gc,
            width as u16,
            height as u16,
            0,
            0,
            0,
            self.a8_depth(),
            alpha,
        );
        let _ = self.conn.free_gc(gc);
    }
}

impl XRenderBackend<'_> {
    fn a8_depth(&self) -> u8 {
        8
    }
}
