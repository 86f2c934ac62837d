//! Wire-event decoding: turns an `x11rb` `Event`/`X11Error` into the plain
//! [`crate::events::DecodedEvent`] the core dispatches. This is the I/O
//! boundary the rest of the crate is deliberately kept out of; every
//! decision here that needs a round trip (window type resolution, property
//! value fetch) issues the request itself before handing the core a fully
//! resolved value.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::damage::ConnectionExt as _;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::protocol::xproto::{self, NotifyMode};
use x11rb::protocol::{Event, X11Error};

use crate::atoms::{parse_frame_extents, parse_opacity, Atoms};
use crate::events::{DecodedEvent, FocusMode, PropertyKind};
use crate::region::Rect;
use crate::window::{Geometry, WindowType};
use crate::xconn::XConn;

/// Resolve a window's EWMH type by property, falling back to the closest
/// child carrying one, finally to `Normal` (spec §4.2).
pub fn resolve_window_type(xconn: &XConn, window: u32) -> Result<WindowType> {
    let reply = xconn
        .conn
        .get_property(
            false,
            window,
            xconn.atoms.net_wm_window_type,
            xproto::AtomEnum::ATOM,
            0,
            32,
        )?
        .reply()?;
    if let Some(t) = xconn.atoms.window_type_from_property(&reply) {
        return Ok(t);
    }
    let tree = xconn.conn.query_tree(window)?.reply()?;
    for &child in &tree.children {
        let child_reply = xconn
            .conn
            .get_property(
                false,
                child,
                xconn.atoms.net_wm_window_type,
                xproto::AtomEnum::ATOM,
                0,
                32,
            )?
            .reply()?;
        if let Some(t) = xconn.atoms.window_type_from_property(&child_reply) {
            return Ok(t);
        }
    }
    Ok(WindowType::Normal)
}

fn focus_mode(mode: xproto::NotifyMode) -> FocusMode {
    match mode {
        NotifyMode::GRAB => FocusMode::Grab,
        NotifyMode::UNGRAB => FocusMode::Ungrab,
        NotifyMode::WHILE_GRABBED => FocusMode::WhileGrabbed,
        _ => FocusMode::Other,
    }
}

fn decode_property_kind(xconn: &XConn, atoms: &Atoms, window: u32, atom: u32) -> PropertyKind {
    if atom == atoms.net_wm_window_opacity {
        let reply = xconn
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::CARDINAL, 0, 1)
            .ok()
            .and_then(|c| c.reply().ok());
        return PropertyKind::WindowOpacity(reply.as_ref().and_then(parse_opacity));
    }
    if atom == atoms.net_frame_extents {
        let reply = xconn
            .conn
            .get_property(false, window, atom, xproto::AtomEnum::CARDINAL, 0, 4)
            .ok()
            .and_then(|c| c.reply().ok());
        return PropertyKind::FrameExtents(reply.as_ref().and_then(parse_frame_extents));
    }
    if atom == atoms.xrootpmap_id || atom == atoms.xsetroot_id {
        return PropertyKind::RootBackground;
    }
    PropertyKind::Other
}

/// Decode one wire event. Returns `None` for events the core has no use
/// for (spec §7: "unknown event: ignored").
pub fn decode(xconn: &XConn, event: Event) -> Result<Option<DecodedEvent>> {
    Ok(match event {
        Event::CreateNotify(e) => Some(DecodedEvent::CreateNotify {
            window: e.window,
            prev_sibling: None,
            geometry: Geometry {
                x: e.x as i32,
                y: e.y as i32,
                width: e.width as u32,
                height: e.height as u32,
                border_width: e.border_width as u32,
            },
            override_redirect: e.override_redirect,
        }),
        Event::MapNotify(e) => {
            let resolved = resolve_window_type(xconn, e.window)?;
            Some(DecodedEvent::MapNotify {
                window: e.window,
                resolved_window_type: resolved,
                fade_enabled_for_type: true,
            })
        }
        Event::UnmapNotify(e) => Some(DecodedEvent::UnmapNotify { window: e.window }),
        Event::DestroyNotify(e) => Some(DecodedEvent::DestroyNotify { window: e.window }),
        Event::ConfigureNotify(e) => Some(DecodedEvent::ConfigureNotify {
            window: e.window,
            is_root: e.window == xconn.root,
            geometry: Geometry {
                x: e.x as i32,
                y: e.y as i32,
                width: e.width as u32,
                height: e.height as u32,
                border_width: e.border_width as u32,
            },
            above_sibling: (e.above_sibling != 0).then_some(e.above_sibling),
            override_redirect: e.override_redirect,
        }),
        Event::ReparentNotify(e) => Some(DecodedEvent::ReparentNotify {
            window: e.window,
            is_root: e.parent == xconn.root,
        }),
        Event::CirculateNotify(e) => Some(DecodedEvent::CirculateNotify {
            window: e.window,
            place_on_top: e.place == xproto::Circulate::RAISE_LOWEST,
        }),
        Event::Expose(e) => Some(DecodedEvent::Expose {
            rect: Rect::from_xywh(e.x as i32, e.y as i32, e.width as i32, e.height as i32),
            count: e.count,
        }),
        Event::PropertyNotify(e) => Some(DecodedEvent::PropertyNotify {
            window: e.window,
            is_root: e.window == xconn.root,
            kind: decode_property_kind(xconn, &xconn.atoms, e.window, e.atom),
        }),
        Event::DamageNotify(e) => {
            // The event demultiplexer decides whether parts need fetching at
            // all (spec §4.5: first damage just repairs `extents`); fetch
            // eagerly here and let it ignore the parts when unneeded.
            let region = xconn.conn.generate_id()?;
            xconn
                .conn
                .damage_subtract(e.damage, x11rb::NONE, region)?
                .check()?;
            Some(DecodedEvent::DamageNotify {
                window: e.drawable,
                parts: vec![Rect::from_xywh(
                    e.area.x as i32,
                    e.area.y as i32,
                    e.area.width as i32,
                    e.area.height as i32,
                )],
            })
        }
        Event::FocusIn(e) => Some(DecodedEvent::FocusIn {
            window: e.event,
            mode: focus_mode(e.mode),
        }),
        Event::FocusOut(e) => Some(DecodedEvent::FocusOut {
            window: e.event,
            mode: focus_mode(e.mode),
        }),
        Event::Error(err) => Some(decode_error(xconn, err)),
        _ => None,
    })
}

fn decode_error(xconn: &XConn, err: X11Error) -> DecodedEvent {
    // The startup redirect itself is checked synchronously in
    // `XConn::connect` (its `.check()` surfaces as a startup `anyhow`
    // error); a BadAccess arriving later on the same request class still
    // means a second compositor grabbed the redirect after us.
    let is_composite_redirect_subwindows = err.error_kind == x11rb::protocol::ErrorKind::Access
        && err.major_opcode == xconn.composite_major_opcode;
    DecodedEvent::Error {
        sequence: err.sequence as u64,
        is_composite_redirect_subwindows,
        decoded_name: format!("{:?}", err.error_kind),
    }
}
