//! Main loop (spec §4.10, §5): single-threaded, blocks on the X connection
//! fd with a timeout equal to the next fade deadline, drains all queued
//! events, then ticks/plans/paints when there's damage.
//!
//! Grounded on `ohsalmeron-area`'s use of `mio` to poll an `x11rb` fd with a
//! timeout (the same "block with timeout, then drain" shape); this loop
//! additionally threads the fade scheduler's deadline through as the poll
//! timeout per spec §4.4/§4.10, which `ohsalmeron-area`'s fixed-framerate
//! loop doesn't need to do.

use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};

use anyhow::Result;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::{error, warn};
use x11rb::connection::Connection;

use crate::events::{Core, EventAction, EventPolicy};
use crate::xconn::XConn;

const X_CONNECTION: Token = Token(0);

/// Millisecond clock anchored at loop start, since the core never calls
/// `Instant::now()`/`SystemTime::now()` itself (spec §5: the only timer is
/// the fade tick, expressed as an absolute deadline).
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the cooperative loop until a fatal action is observed or the
/// connection closes. `on_action` lets the caller apply I/O-requiring
/// [`EventAction`]s (select input, free a damage object, paint) — kept as a
/// callback so this function stays free of any specific renderer.
pub fn run(
    xconn: &XConn,
    core: &mut Core,
    policy: &EventPolicy,
    clock: &Clock,
    mut on_actions: impl FnMut(&mut Core, &XConn, &[EventAction]) -> Result<()>,
    mut on_frame: impl FnMut(&mut Core, &XConn) -> Result<()>,
) -> Result<()> {
    let mut poll = Poll::new()?;
    let raw_fd = xconn.conn.as_raw_fd();
    let mut source = SourceFd(&raw_fd);
    poll.registry()
        .register(&mut source, X_CONNECTION, Interest::READABLE)?;
    let mut events = Events::with_capacity(16);

    loop {
        let timeout = core
            .fades
            .fade_timeout(clock.now_ms())
            .map(Duration::from_millis);
        poll.poll(&mut events, timeout)?;

        // Drain all queued X events before considering a paint (spec §4.10,
        // §5: "X events drain fully before paint").
        while let Some(event) = xconn.conn.poll_for_event()? {
            let sequence = x11rb_event_sequence(&event);
            match crate::decode::decode(xconn, event) {
                Ok(Some(decoded)) => {
                    let actions = core.dispatch(sequence, clock.now_ms(), policy, decoded);
                    if actions
                        .iter()
                        .any(|a| *a == EventAction::AbortAnotherCompositorRunning)
                    {
                        anyhow::bail!("another composite manager is already running");
                    }
                    on_actions(core, xconn, &actions)?;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to decode X event"),
            }
        }

        let fade_actions = core.tick_fades(clock.now_ms());
        on_actions(core, xconn, &fade_actions)?;

        if !core.damage.is_empty() {
            if let Err(e) = on_frame(core, xconn) {
                error!(error = %e, "paint pass failed");
            }
            core.damage.clear();
        }
    }
}

/// Every core X event (and error) carries a 16-bit request sequence number
/// in its wire header; this just reads it back out of whichever variant we
/// actually decode (spec §4.3: "discard ignore-sequences older than the
/// event" needs it before dispatch).
fn x11rb_event_sequence(event: &x11rb::protocol::Event) -> u64 {
    use x11rb::protocol::Event;
    (match event {
        Event::CreateNotify(e) => e.sequence,
        Event::MapNotify(e) => e.sequence,
        Event::UnmapNotify(e) => e.sequence,
        Event::DestroyNotify(e) => e.sequence,
        Event::ConfigureNotify(e) => e.sequence,
        Event::ReparentNotify(e) => e.sequence,
        Event::CirculateNotify(e) => e.sequence,
        Event::Expose(e) => e.sequence,
        Event::PropertyNotify(e) => e.sequence,
        Event::DamageNotify(e) => e.sequence,
        Event::FocusIn(e) => e.sequence,
        Event::FocusOut(e) => e.sequence,
        Event::Error(e) => e.sequence,
        _ => 0,
    }) as u64
}
