//! Atom interning and typed property getters (spec §2 "Atom & property
//! cache", §6.1).
//!
//! Interning happens once at startup against the live connection; everything
//! downstream of that (the `parse_*` functions) is pure data decoding so it
//! can be exercised without an X server.

use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{Atom, ConnectionExt, GetPropertyReply};

use crate::window::WindowType;

/// Every atom name the core reads or writes, interned once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_wm_window_type: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_frame_extents: Atom,
    pub wm_state: Atom,
    pub xrootpmap_id: Atom,
    pub xsetroot_id: Atom,

    // Closed set of `_NET_WM_WINDOW_TYPE_*` values, ordered the way
    // `WindowType::from_first_known` checks them (first match in the
    // property's atom list wins, per spec §4.2).
    pub wt_desktop: Atom,
    pub wt_dock: Atom,
    pub wt_toolbar: Atom,
    pub wt_menu: Atom,
    pub wt_utility: Atom,
    pub wt_splash: Atom,
    pub wt_dialog: Atom,
    pub wt_normal: Atom,
    pub wt_dropdown_menu: Atom,
    pub wt_popup_menu: Atom,
    pub wt_tooltip: Atom,
    pub wt_notification: Atom,
    pub wt_combo: Atom,
    pub wt_dnd: Atom,
}

macro_rules! intern {
    ($conn:expr, $($name:literal),+ $(,)?) => {
        {
            let conn = $conn;
            let cookies = [$( conn.intern_atom(false, $name.as_bytes())? ),+];
            let mut replies = cookies.into_iter();
            ( $( { let _ = $name; replies.next().unwrap().reply()?.atom } ),+ )
        }
    };
}

impl Atoms {
    pub fn intern<C: ConnectionExt>(conn: &C) -> Result<Self, ReplyError> {
        let (
            net_wm_window_type,
            net_wm_window_opacity,
            net_frame_extents,
            wm_state,
            xrootpmap_id,
            xsetroot_id,
            wt_desktop,
            wt_dock,
            wt_toolbar,
            wt_menu,
            wt_utility,
            wt_splash,
            wt_dialog,
            wt_normal,
            wt_dropdown_menu,
            wt_popup_menu,
            wt_tooltip,
            wt_notification,
            wt_combo,
            wt_dnd,
        ) = intern!(
            conn,
            "_NET_WM_WINDOW_TYPE",
            "_NET_WM_WINDOW_OPACITY",
            "_NET_FRAME_EXTENTS",
            "WM_STATE",
            "_XROOTPMAP_ID",
            "_XSETROOT_ID",
            "_NET_WM_WINDOW_TYPE_DESKTOP",
            "_NET_WM_WINDOW_TYPE_DOCK",
            "_NET_WM_WINDOW_TYPE_TOOLBAR",
            "_NET_WM_WINDOW_TYPE_MENU",
            "_NET_WM_WINDOW_TYPE_UTILITY",
            "_NET_WM_WINDOW_TYPE_SPLASH",
            "_NET_WM_WINDOW_TYPE_DIALOG",
            "_NET_WM_WINDOW_TYPE_NORMAL",
            "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU",
            "_NET_WM_WINDOW_TYPE_POPUP_MENU",
            "_NET_WM_WINDOW_TYPE_TOOLTIP",
            "_NET_WM_WINDOW_TYPE_NOTIFICATION",
            "_NET_WM_WINDOW_TYPE_COMBO",
            "_NET_WM_WINDOW_TYPE_DND",
        );

        Ok(Self {
            net_wm_window_type,
            net_wm_window_opacity,
            net_frame_extents,
            wm_state,
            xrootpmap_id,
            xsetroot_id,
            wt_desktop,
            wt_dock,
            wt_toolbar,
            wt_menu,
            wt_utility,
            wt_splash,
            wt_dialog,
            wt_normal,
            wt_dropdown_menu,
            wt_popup_menu,
            wt_tooltip,
            wt_notification,
            wt_combo,
            wt_dnd,
        })
    }

    /// First known atom in the property's value list wins; unrecognized
    /// entries are skipped rather than rejecting the whole property.
    pub fn window_type_from_property(&self, reply: &GetPropertyReply) -> Option<WindowType> {
        let values = reply.value32()?;
        for atom in values {
            if let Some(t) = self.classify_window_type(atom) {
                return Some(t);
            }
        }
        None
    }

    fn classify_window_type(&self, atom: Atom) -> Option<WindowType> {
        Some(match atom {
            a if a == self.wt_desktop => WindowType::Desktop,
            a if a == self.wt_dock => WindowType::Dock,
            a if a == self.wt_toolbar => WindowType::Toolbar,
            a if a == self.wt_menu => WindowType::Menu,
            a if a == self.wt_utility => WindowType::Utility,
            a if a == self.wt_splash => WindowType::Splash,
            a if a == self.wt_dialog => WindowType::Dialog,
            a if a == self.wt_normal => WindowType::Normal,
            a if a == self.wt_dropdown_menu => WindowType::DropdownMenu,
            a if a == self.wt_popup_menu => WindowType::PopupMenu,
            a if a == self.wt_tooltip => WindowType::Tooltip,
            a if a == self.wt_notification => WindowType::Notify,
            a if a == self.wt_combo => WindowType::Combo,
            a if a == self.wt_dnd => WindowType::Dnd,
            _ => return None,
        })
    }
}

/// `_NET_WM_WINDOW_OPACITY` is CARDINAL/32, already scaled to the "opaque"
/// constant (spec §6.1).
pub fn parse_opacity(reply: &GetPropertyReply) -> Option<u32> {
    reply.value32()?.next()
}

/// `_NET_FRAME_EXTENTS` is CARDINAL[4] = left, right, top, bottom.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameExtents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

pub fn parse_frame_extents(reply: &GetPropertyReply) -> Option<FrameExtents> {
    let mut v = reply.value32()?;
    Some(FrameExtents {
        left: v.next()? as i32,
        right: v.next()? as i32,
        top: v.next()? as i32,
        bottom: v.next()? as i32,
    })
}

/// `_XROOTPMAP_ID`/`_XSETROOT_ID` are PIXMAP/32 of length 1.
pub fn parse_root_pixmap(reply: &GetPropertyReply) -> Option<u32> {
    if reply.format != 32 || reply.value_len != 1 {
        return None;
    }
    reply.value32()?.next()
}

/// Presence-only check used to find the client window inside a frame
/// (spec §3.1, §4.2: walk children for a window carrying `WM_STATE`).
pub fn has_wm_state(reply: &GetPropertyReply) -> bool {
    reply.type_ != 0
}
