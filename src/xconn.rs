//! X connection wrapper: extension negotiation, single-instance selection
//! ownership, and wire-event decoding (spec §6.1, §11).
//!
//! Grounded directly on `ohsalmeron-area`'s `Compositor::new` (extension
//! presence + version-query negotiation before any extension request,
//! `composite_redirect_subwindows`, overlay window acquisition, input-shape
//! punch-through) and on `willothy-recomp`'s commented-out selection-
//! ownership sketch for `_NET_WM_CM_S<n>` registration, completed here since
//! the redesigned core actually needs it (spec §11).

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::composite::{self, ConnectionExt as _, Redirect};
use x11rb::protocol::damage::{self, ConnectionExt as _};
use x11rb::protocol::render::{self, ConnectionExt as _};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _, EventMask};
use x11rb::rust_connection::RustConnection;

use crate::atoms::Atoms;
use crate::error::CoreError;

pub struct XConn {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root: u32,
    pub overlay_window: u32,
    pub atoms: Atoms,
    /// Major opcode the server assigned the Composite extension, needed to
    /// tell a `BadAccess` on `CompositeRedirectSubwindows` apart from any
    /// other access error (spec §7, §11).
    pub composite_major_opcode: u8,
}

fn require_extension(
    conn: &RustConnection,
    name: &'static [u8],
    display_name: &'static str,
) -> Result<u8> {
    let info = conn
        .extension_information(name)?
        .ok_or(CoreError::MissingExtension(display_name))?;
    Ok(info.major_opcode)
}

impl XConn {
    /// Connect, negotiate every required extension (spec §11: "fail fast...
    /// rather than discovering the gap on first use"), redirect subwindows
    /// in manual mode, and acquire the composite overlay window.
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(display)
            .context("failed to connect to the X display")?;

        let composite_major_opcode = require_extension(&conn, composite::X11_EXTENSION_NAME, "Composite")?;
        require_extension(&conn, damage::X11_EXTENSION_NAME, "Damage")?;
        require_extension(&conn, xfixes::X11_EXTENSION_NAME, "XFixes")?;
        require_extension(&conn, render::X11_EXTENSION_NAME, "Render")?;
        require_extension(&conn, shape::X11_EXTENSION_NAME, "Shape")?;

        let composite_version = conn.composite_query_version(0, 4)?.reply()?;
        info!(
            major = composite_version.major_version,
            minor = composite_version.minor_version,
            "negotiated Composite extension"
        );
        let damage_version = conn.damage_query_version(1, 1)?.reply()?;
        info!(
            major = damage_version.major_version,
            minor = damage_version.minor_version,
            "negotiated Damage extension"
        );
        let xfixes_version = conn.xfixes_query_version(5, 0)?.reply()?;
        info!(
            major = xfixes_version.major_version,
            minor = xfixes_version.minor_version,
            "negotiated XFixes extension"
        );

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        let atoms = Atoms::intern(&conn)?;

        acquire_cm_selection(&conn, screen_num, root)?;

        conn.composite_redirect_subwindows(root, Redirect::MANUAL)?
            .check()
            .context("failed to redirect subwindows (another compositor running?)")?;

        let overlay_window = conn
            .composite_get_overlay_window(root)?
            .reply()?
            .overlay_win;

        // Let input pass through the overlay to whatever's beneath it.
        conn.shape_rectangles(
            xproto::SO::SET,
            xproto::SK::INPUT,
            xproto::ClipOrdering::UNSORTED,
            overlay_window,
            0,
            0,
            &[],
        )?
        .check()?;

        conn.change_window_attributes(
            root,
            &xproto::ChangeWindowAttributesAux::new().event_mask(
                EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::EXPOSURE
                    | EventMask::STRUCTURE_NOTIFY
                    | EventMask::PROPERTY_CHANGE,
            ),
        )?
        .check()
        .context("failed to select input on the root window")?;

        conn.flush()?;

        Ok(Self {
            conn,
            screen_num,
            root,
            overlay_window,
            atoms,
            composite_major_opcode,
        })
    }

    pub fn select_window_input(&self, window: u32) -> Result<()> {
        self.conn
            .change_window_attributes(
                window,
                &xproto::ChangeWindowAttributesAux::new()
                    .event_mask(EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE),
            )?
            .check()?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    /// Fetch `_XROOTPMAP_ID` then `_XSETROOT_ID` off the root window (spec
    /// §4.8), decoding each with [`crate::atoms::parse_root_pixmap`].
    pub fn fetch_root_tile_ids(&self) -> Result<(Option<u32>, Option<u32>)> {
        let xrootpmap_id = self
            .conn
            .get_property(false, self.root, self.atoms.xrootpmap_id, xproto::AtomEnum::PIXMAP, 0, 1)?
            .reply()
            .ok();
        let xsetroot_id = self
            .conn
            .get_property(false, self.root, self.atoms.xsetroot_id, xproto::AtomEnum::PIXMAP, 0, 1)?
            .reply()
            .ok();
        Ok((
            xrootpmap_id.as_ref().and_then(crate::atoms::parse_root_pixmap),
            xsetroot_id.as_ref().and_then(crate::atoms::parse_root_pixmap),
        ))
    }
}

/// Acquire `_NET_WM_CM_S<screen>` on a small registration window carrying
/// `WM_NAME = "xcompmgr"` (spec §6.1, §11). Fails with
/// [`CoreError::AnotherCompositorRunning`] if the selection is already
/// owned by a live client.
fn acquire_cm_selection(conn: &RustConnection, screen_num: usize, root: u32) -> Result<()> {
    let selection_name = format!("_NET_WM_CM_S{screen_num}");
    let selection_atom = conn.intern_atom(false, selection_name.as_bytes())?.reply()?.atom;

    let existing_owner = conn.get_selection_owner(selection_atom)?.reply()?.owner;
    if existing_owner != x11rb::NONE {
        return Err(CoreError::AnotherCompositorRunning.into());
    }

    let win = conn.generate_id()?;
    let screen = &conn.setup().roots[screen_num];
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        win,
        root,
        -1,
        -1,
        1,
        1,
        0,
        xproto::WindowClass::INPUT_OUTPUT,
        screen.root_visual,
        &xproto::CreateWindowAux::new(),
    )?
    .check()?;

    let wm_name = conn.intern_atom(false, b"WM_NAME")?.reply()?.atom;
    conn.change_property8(
        xproto::PropMode::REPLACE,
        win,
        wm_name,
        xproto::AtomEnum::STRING,
        b"xcompmgr",
    )?
    .check()?;

    conn.set_selection_owner(win, selection_atom, x11rb::CURRENT_TIME)?
        .check()?;

    let owner_now = conn.get_selection_owner(selection_atom)?.reply()?.owner;
    if owner_now != win {
        warn!("lost the race for {selection_name}, another compositor won it");
        return Err(CoreError::AnotherCompositorRunning.into());
    }

    debug!(window = win, "acquired {selection_name}");
    Ok(())
}
