//! The central entity: one top-level X resource the core manages (spec
//! §3.1), plus the lifecycle state machine events drive it through (§4.2).
//!
//! Ported from the teacher's `abi/src/window.rs` (`WindowInfo`) and
//! `video/src/compositor_context.rs` (`SurfaceState`) shape — geometry,
//! damage count/regions, title, z-order-by-position-in-a-stacking-vector —
//! generalized from a fixed-size ABI-stable struct to an owned record that
//! also tracks the X-specific resources (picture/pixmap/damage handle/shape)
//! those kernel structs didn't need because the client owned its buffer
//! directly.

use crate::region::Region;

pub type WindowId = u32;
pub type Atom = u32;
pub type PictureId = u32;
pub type PixmapId = u32;
pub type DamageId = u32;

/// Closed EWMH-derived window type set (spec §3.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WindowType {
    Unknown,
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    Normal,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notify,
    Combo,
    Dnd,
}

impl WindowType {
    pub const ALL: [WindowType; 15] = [
        WindowType::Unknown,
        WindowType::Desktop,
        WindowType::Dock,
        WindowType::Toolbar,
        WindowType::Menu,
        WindowType::Utility,
        WindowType::Splash,
        WindowType::Dialog,
        WindowType::Normal,
        WindowType::DropdownMenu,
        WindowType::PopupMenu,
        WindowType::Tooltip,
        WindowType::Notify,
        WindowType::Combo,
        WindowType::Dnd,
    ];
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::Unknown
    }
}

/// Window lifecycle state machine (spec §4.2). Terminal removal happens
/// only after a fade-out resolves to target opacity 0, so `Destroying`
/// windows linger in the table with `destroyed = true` until then.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WindowState {
    Unmapped,
    Mapping,
    Mapped,
    Fading,
    Unmapping,
    Destroying,
}

/// Visual/paint mode (spec §3.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Solid,
    Trans,
    Argb,
}

/// Geometry in root coordinates, including the X border.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

impl Geometry {
    pub fn widthb(&self) -> u32 {
        self.width + 2 * self.border_width
    }

    pub fn heightb(&self) -> u32 {
        self.height + 2 * self.border_width
    }

    pub fn rect(&self) -> crate::region::Rect {
        crate::region::Rect::from_xywh(
            self.x,
            self.y,
            self.widthb() as i32,
            self.heightb() as i32,
        )
    }
}

/// `_NET_FRAME_EXTENTS`-derived border widths (spec §3.1).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameExtents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl FrameExtents {
    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }
}

pub const OPAQUE: u32 = 0xffff_ffff;

/// Opacity state: a current/target pair driven by the fade scheduler, the
/// raw property value, and the frame (border) opacity (spec §3.1).
#[derive(Copy, Clone, Debug)]
pub struct Opacity {
    pub current: u32,
    pub target: u32,
    pub property: Option<u32>,
    pub frame_opacity: f64,
}

impl Default for Opacity {
    fn default() -> Self {
        Self {
            current: OPAQUE,
            target: OPAQUE,
            property: None,
            frame_opacity: 1.0,
        }
    }
}

/// A queued ConfigureNotify, remembered verbatim while unmapped and replayed
/// at the next Map (spec §4.2).
#[derive(Copy, Clone, Debug)]
pub struct PendingConfigure {
    pub geometry: Geometry,
}

/// On-server content/shadow/mask resources. Opaque ids owned by the backend
/// renderer (spec §6.2); the core only tracks presence/absence so it knows
/// when to (re)build or free them.
#[derive(Copy, Clone, Debug, Default)]
pub struct Textures {
    pub pixmap: Option<PixmapId>,
    pub picture: Option<PictureId>,
    pub alpha_mask_body: Option<PictureId>,
    pub alpha_mask_frame: Option<PictureId>,
    pub shadow_picture: Option<PictureId>,
    pub shadow_width: u32,
    pub shadow_height: u32,
    pub shadow_dx: i32,
    pub shadow_dy: i32,
}

/// One managed top-level window (spec §3.1).
pub struct Window {
    pub id: WindowId,
    pub client_window: Option<WindowId>,
    pub window_type: WindowType,
    pub override_redirect: bool,
    pub input_only: bool,

    pub geometry: Geometry,
    pub pending_configure: Option<PendingConfigure>,

    pub state: WindowState,
    pub destroyed: bool,
    pub mode: Mode,
    pub opacity: Opacity,
    pub frame_extents: FrameExtents,

    /// Bounding-shape-derived region in root coordinates, or `None` if not
    /// yet fetched this geometry.
    pub bounding_shape: Option<Region>,
    /// `bounding_shape ∩ window rectangle`.
    pub border_size: Option<Region>,
    /// `border_size ∪ shadow rectangle` (when shadow-enabled).
    pub extents: Option<Region>,
    /// Per-paint clip, valid only during the painter's pass.
    pub border_clip: Option<Region>,

    pub textures: Textures,

    pub damage: Option<DamageId>,
    pub ever_damaged: bool,
    pub damaged_this_frame: bool,

    /// Paint-order back-link set by the planner (spec §4.6); not a raw
    /// pointer, just the id of the previously selected paintable window.
    pub prev_trans: Option<WindowId>,

    pub focused: bool,

    /// True once this window has gone through `clip_changed` invalidation
    /// and needs `border_clip`/extents recomputed before the next paint.
    pub clip_changed: bool,
}

impl Window {
    pub fn new(id: WindowId, override_redirect: bool) -> Self {
        Self {
            id,
            client_window: None,
            window_type: WindowType::Unknown,
            override_redirect,
            input_only: false,
            geometry: Geometry::default(),
            pending_configure: None,
            state: WindowState::Unmapped,
            destroyed: false,
            mode: Mode::Solid,
            opacity: Opacity::default(),
            frame_extents: FrameExtents::default(),
            bounding_shape: None,
            border_size: None,
            extents: None,
            border_clip: None,
            textures: Textures::default(),
            damage: None,
            ever_damaged: false,
            damaged_this_frame: false,
            prev_trans: None,
            focused: false,
            clip_changed: true,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.damaged_this_frame
    }

    /// Invalidate everything derived from geometry/shape: `extents` becomes
    /// stale whenever geometry or shadow opacity changes (spec §3.1
    /// invariant).
    pub fn invalidate_extents(&mut self) {
        self.extents = None;
        self.clip_changed = true;
    }

    pub fn free_content(&mut self) {
        self.textures.pixmap = None;
        self.textures.picture = None;
        self.textures.alpha_mask_body = None;
        self.textures.alpha_mask_frame = None;
    }

    pub fn free_shadow(&mut self) {
        self.textures.shadow_picture = None;
        self.textures.shadow_width = 0;
        self.textures.shadow_height = 0;
    }

    /// Opaque iff SOLID and no frame-opacity carve-out is active (spec
    /// §3.1 invariant, used by the planner to build `reg_ignore`).
    pub fn is_fully_opaque(&self) -> bool {
        self.mode == Mode::Solid && !self.has_frame_opacity_carveout()
    }

    pub fn has_frame_opacity_carveout(&self) -> bool {
        self.opacity.frame_opacity < 1.0 && !self.frame_extents.is_zero()
    }
}

/// Walk a window's children in X stacking order and return the first one
/// whose `WM_STATE` property is present — this is a pure selection over an
/// already-fetched list, kept separate from the I/O that produced it so it
/// can be unit tested.
pub fn find_client_window(children_with_wm_state: &[(WindowId, bool)]) -> Option<WindowId> {
    children_with_wm_state
        .iter()
        .find(|(_, has_state)| *has_state)
        .map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widthb_includes_both_borders() {
        let g = Geometry {
            x: 0,
            y: 0,
            width: 100,
            height: 50,
            border_width: 2,
        };
        assert_eq!(g.widthb(), 104);
        assert_eq!(g.heightb(), 54);
    }

    #[test]
    fn fully_opaque_requires_solid_and_no_carveout() {
        let mut w = Window::new(1, false);
        w.mode = Mode::Solid;
        assert!(w.is_fully_opaque());
        w.frame_extents = FrameExtents { left: 1, right: 1, top: 1, bottom: 1 };
        w.opacity.frame_opacity = 0.5;
        assert!(!w.is_fully_opaque());
    }

    #[test]
    fn find_client_window_picks_first_with_wm_state() {
        let kids = [(10, false), (11, true), (12, true)];
        assert_eq!(find_client_window(&kids), Some(11));
    }
}
