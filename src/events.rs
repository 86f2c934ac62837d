//! Event demultiplexer (spec §4.2, §4.3): decoded X events drive the window
//! table's state machine. Everything here is plain data in, plain data out —
//! no X11 types appear in this module, so the dispatch logic is testable
//! without a connection. The collaborator that owns an actual `x11rb`
//! connection decodes wire events into `DecodedEvent` and executes the
//! returned `EventAction`s.
//!
//! Grounded on the teacher's event funnel in
//! `userland/src/apps/compositor/input.rs` (decode once, dispatch through a
//! single match, return a list of effects for the platform layer to apply)
//! generalized from its fixed input-event set to the X lifecycle events this
//! spec names.

use crate::atoms::FrameExtents;
use crate::damage::{repair_win, DamageAggregator};
use crate::fade::{FadeOutcome, FadeScheduler};
use crate::ignore::IgnoreLog;
use crate::region::{Rect, Region};
use crate::window::{Geometry, Mode, Window, WindowId, WindowState, WindowType, OPAQUE};
use crate::window_table::WindowTable;

/// A property change already classified and decoded by the I/O boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyKind {
    WindowOpacity(Option<u32>),
    FrameExtents(Option<FrameExtents>),
    RootBackground,
    Other,
}

/// Focus transition detail (spec §4.3's `FocusIn`/`FocusOut` restriction).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FocusMode {
    Grab,
    Ungrab,
    WhileGrabbed,
    Nonlinear,
    NonlinearVirtual,
    Other,
}

/// One decoded X event, already stripped of wire encoding.
#[derive(Clone, Debug)]
pub enum DecodedEvent {
    CreateNotify {
        window: WindowId,
        prev_sibling: Option<WindowId>,
        geometry: Geometry,
        override_redirect: bool,
    },
    /// `resolved_window_type` is supplied by the caller, which may have had
    /// to walk children and fetch `_NET_WM_WINDOW_TYPE` (spec §4.2) — that
    /// walk is I/O and doesn't belong in this module.
    MapNotify {
        window: WindowId,
        resolved_window_type: WindowType,
        fade_enabled_for_type: bool,
    },
    UnmapNotify {
        window: WindowId,
    },
    DestroyNotify {
        window: WindowId,
    },
    ConfigureNotify {
        window: WindowId,
        is_root: bool,
        geometry: Geometry,
        above_sibling: Option<WindowId>,
        override_redirect: bool,
    },
    ReparentNotify {
        window: WindowId,
        is_root: bool,
    },
    CirculateNotify {
        window: WindowId,
        place_on_top: bool,
    },
    Expose {
        rect: Rect,
        count: u16,
    },
    PropertyNotify {
        window: WindowId,
        is_root: bool,
        kind: PropertyKind,
    },
    DamageNotify {
        window: WindowId,
        /// `None` until fetched; the caller only fetches parts when the
        /// window has already been damaged once (spec §4.5).
        parts: Vec<Rect>,
    },
    FocusIn {
        window: WindowId,
        mode: FocusMode,
    },
    FocusOut {
        window: WindowId,
        mode: FocusMode,
    },
    Error {
        sequence: u64,
        is_composite_redirect_subwindows: bool,
        decoded_name: String,
    },
}

/// Side effects the core can't perform itself (I/O, process exit). The
/// caller (the connection wrapper / main loop) executes these in order.
#[derive(Clone, Debug, PartialEq)]
pub enum EventAction {
    SelectWindowInput { window: WindowId },
    FreeDamage { window: WindowId },
    InvalidateRootTile,
    DiscardBackBuffer,
    AbortAnotherCompositorRunning,
    LogSwallowedError { sequence: u64 },
    LogUnswallowedError { decoded_name: String },
    /// Window finished its terminal fade-out and should be unlinked from the
    /// table (already done) and have any remaining server-side handles the
    /// table itself doesn't own released.
    FinalizedDestroy { window: WindowId },
    FinalizedUnmap { window: WindowId },
}

/// Toggles that would otherwise live in config but which the dispatch logic
/// needs directly (spec §4.3 FocusIn/FocusOut gating, §4.4 fade steps).
pub struct EventPolicy {
    pub fade_in_step: i64,
    pub fade_out_step: i64,
    pub inactive_opacity_enabled: bool,
    pub inactive_opacity: u32,
}

impl Default for EventPolicy {
    fn default() -> Self {
        Self {
            fade_in_step: 28,
            fade_out_step: 28,
            inactive_opacity_enabled: false,
            inactive_opacity: OPAQUE,
        }
    }
}

/// Everything mutable the dispatcher touches, gathered so call sites don't
/// have to pass eight separate `&mut` parameters.
pub struct Core {
    pub windows: WindowTable,
    pub ignore: IgnoreLog,
    pub fades: FadeScheduler,
    pub damage: DamageAggregator,
    pub root_tile_dirty: bool,
    expose_accum: Region,
}

impl Core {
    pub fn new(fade_delta_ms: u64) -> Self {
        Self {
            windows: WindowTable::new(),
            ignore: IgnoreLog::new(),
            fades: FadeScheduler::new(fade_delta_ms),
            damage: DamageAggregator::new(),
            root_tile_dirty: true,
            expose_accum: Region::empty(),
        }
    }

    /// Dispatch one decoded event (spec §4.3). `event_sequence` is used to
    /// discard stale ignore-log entries first, per the spec's ordering rule.
    pub fn dispatch(
        &mut self,
        event_sequence: u64,
        now_ms: u64,
        policy: &EventPolicy,
        event: DecodedEvent,
    ) -> Vec<EventAction> {
        self.ignore.discard_older_than(event_sequence);
        match event {
            DecodedEvent::CreateNotify {
                window,
                prev_sibling,
                geometry,
                override_redirect,
            } => self.on_create(window, prev_sibling, geometry, override_redirect),
            DecodedEvent::MapNotify {
                window,
                resolved_window_type,
                fade_enabled_for_type,
            } => self.on_map(window, resolved_window_type, fade_enabled_for_type, policy),
            DecodedEvent::UnmapNotify { window } => self.on_unmap(window, policy),
            DecodedEvent::DestroyNotify { window } => self.on_destroy(window, policy),
            DecodedEvent::ConfigureNotify {
                window,
                is_root,
                geometry,
                above_sibling,
                override_redirect,
            } => self.on_configure(window, is_root, geometry, above_sibling, override_redirect),
            DecodedEvent::ReparentNotify { window, is_root } => {
                self.on_reparent(window, is_root, policy)
            }
            DecodedEvent::CirculateNotify {
                window,
                place_on_top,
            } => {
                if place_on_top {
                    self.windows.restack_top(window);
                } else {
                    self.windows.restack_bottom(window);
                }
                Vec::new()
            }
            DecodedEvent::Expose { rect, count } => {
                self.expose_accum = self.expose_accum.union_rect(rect);
                if count == 0 {
                    self.damage.union_region(&self.expose_accum);
                    self.expose_accum = Region::empty();
                }
                Vec::new()
            }
            DecodedEvent::PropertyNotify {
                window,
                is_root,
                kind,
            } => self.on_property(window, is_root, kind),
            DecodedEvent::DamageNotify { window, parts } => self.on_damage(window, parts),
            DecodedEvent::FocusIn { window, mode } => self.on_focus_in(window, mode, policy),
            DecodedEvent::FocusOut { window, mode } => self.on_focus_out(window, mode, policy),
            DecodedEvent::Error {
                sequence,
                is_composite_redirect_subwindows,
                decoded_name,
            } => self.on_error(sequence, is_composite_redirect_subwindows, decoded_name),
        }
    }

    fn on_create(
        &mut self,
        window: WindowId,
        prev_sibling: Option<WindowId>,
        geometry: Geometry,
        override_redirect: bool,
    ) -> Vec<EventAction> {
        let mut w = Window::new(window, override_redirect);
        w.geometry = geometry;
        self.windows.insert_after(w, prev_sibling);
        Vec::new()
    }

    fn on_map(
        &mut self,
        window: WindowId,
        resolved_window_type: WindowType,
        fade_enabled_for_type: bool,
        policy: &EventPolicy,
    ) -> Vec<EventAction> {
        let mut actions = Vec::new();
        let Some(w) = self.windows.find_any_mut(window) else {
            return actions;
        };
        w.window_type = resolved_window_type;
        w.state = WindowState::Mapping;
        if let Some(pending) = w.pending_configure.take() {
            w.geometry = pending.geometry;
            w.invalidate_extents();
        }
        if !w.override_redirect {
            actions.push(EventAction::SelectWindowInput { window });
        }
        if fade_enabled_for_type {
            let target = w.opacity.target;
            self.fades.start(window, 0, target, policy.fade_in_step);
            if let Some(w) = self.windows.find_any_mut(window) {
                w.state = WindowState::Fading;
                w.opacity.current = 0;
            }
        } else if let Some(w) = self.windows.find_any_mut(window) {
            w.state = WindowState::Mapped;
            w.opacity.current = w.opacity.target;
        }
        actions
    }

    fn on_unmap(&mut self, window: WindowId, policy: &EventPolicy) -> Vec<EventAction> {
        let Some(w) = self.windows.find_any_mut(window) else {
            return Vec::new();
        };
        w.state = WindowState::Unmapping;
        let current = w.opacity.current as i64;
        self.fades.start(window, current, 0, policy.fade_out_step);
        Vec::new()
    }

    fn on_destroy(&mut self, window: WindowId, policy: &EventPolicy) -> Vec<EventAction> {
        let mut actions = Vec::new();
        let Some(w) = self.windows.find_any_mut(window) else {
            return actions;
        };
        w.destroyed = true;
        w.state = WindowState::Destroying;
        let damage_freed = w.damage.take().is_some();
        let current = w.opacity.current as i64;
        if damage_freed {
            actions.push(EventAction::FreeDamage { window });
        }
        self.fades.start(window, current, 0, policy.fade_out_step);
        actions
    }

    fn on_configure(
        &mut self,
        window: WindowId,
        is_root: bool,
        geometry: Geometry,
        above_sibling: Option<WindowId>,
        override_redirect: bool,
    ) -> Vec<EventAction> {
        if is_root {
            return vec![EventAction::DiscardBackBuffer];
        }
        let Some(w) = self.windows.find_any_mut(window) else {
            // Not yet known (pre-Create or already gone); nothing to do.
            self.windows.restack_win(window, above_sibling);
            return Vec::new();
        };
        w.override_redirect = override_redirect;
        if w.state == WindowState::Unmapped || w.state == WindowState::Mapping {
            w.pending_configure = Some(crate::window::PendingConfigure { geometry });
        } else {
            let size_changed =
                w.geometry.widthb() != geometry.widthb() || w.geometry.heightb() != geometry.heightb();
            let old_extents = w.extents.clone();
            w.geometry = geometry;
            if size_changed {
                w.free_content();
                w.free_shadow();
            }
            if let Some(old) = old_extents {
                self.damage.union_region(&old);
            }
            w.invalidate_extents();
        }
        self.windows.restack_win(window, above_sibling);
        Vec::new()
    }

    fn on_reparent(&mut self, window: WindowId, is_root: bool, policy: &EventPolicy) -> Vec<EventAction> {
        if is_root {
            // Equivalent to Create+Map (spec §4.2); the caller is expected to
            // have already sent a CreateNotify/MapNotify pair for this case
            // at the X protocol level in the common case, so this is a no-op
            // safeguard unless the window is genuinely unknown.
            if !self.windows.contains(window) {
                self.on_create(window, None, Geometry::default(), false);
            }
            Vec::new()
        } else {
            self.on_destroy(window, policy)
        }
    }

    fn on_property(&mut self, window: WindowId, is_root: bool, kind: PropertyKind) -> Vec<EventAction> {
        if is_root {
            if matches!(kind, PropertyKind::RootBackground) {
                self.root_tile_dirty = true;
                return vec![EventAction::InvalidateRootTile];
            }
            return Vec::new();
        }
        match kind {
            PropertyKind::WindowOpacity(value) => {
                if let Some(w) = self.windows.find_any_mut(window) {
                    let target = value.unwrap_or(OPAQUE);
                    w.opacity.property = value;
                    w.opacity.target = target;
                    w.mode = if target < OPAQUE { Mode::Trans } else { w.mode };
                    w.state = WindowState::Fading;
                    let current = w.opacity.current as i64;
                    self.fades.start(window, current, target as i64, 28);
                }
                Vec::new()
            }
            PropertyKind::FrameExtents(extents) => {
                if let Some(w) = self.windows.find_any_mut(window) {
                    w.frame_extents = extents.map(|e| crate::window::FrameExtents {
                        left: e.left,
                        right: e.right,
                        top: e.top,
                        bottom: e.bottom,
                    }).unwrap_or_default();
                    w.invalidate_extents();
                }
                Vec::new()
            }
            PropertyKind::RootBackground | PropertyKind::Other => Vec::new(),
        }
    }

    fn on_damage(&mut self, window: WindowId, parts: Vec<Rect>) -> Vec<EventAction> {
        let Some(w) = self.windows.find_any_mut(window) else {
            return Vec::new();
        };
        let origin_x = w.geometry.x + w.geometry.border_width as i32;
        let origin_y = w.geometry.y + w.geometry.border_width as i32;
        let result = repair_win(w.ever_damaged, w.extents.as_ref(), &parts, origin_x, origin_y);
        w.ever_damaged = true;
        w.damaged_this_frame = true;
        self.damage.union_region(&result.repair_region);
        Vec::new()
    }

    fn on_focus_in(&mut self, window: WindowId, mode: FocusMode, policy: &EventPolicy) -> Vec<EventAction> {
        if !policy.inactive_opacity_enabled || mode != FocusMode::Grab {
            return Vec::new();
        }
        self.set_focus_opacity(window, true, policy)
    }

    fn on_focus_out(&mut self, window: WindowId, mode: FocusMode, policy: &EventPolicy) -> Vec<EventAction> {
        if !policy.inactive_opacity_enabled
            || !matches!(
                mode,
                FocusMode::Grab | FocusMode::NonlinearVirtual | FocusMode::Nonlinear
            )
        {
            return Vec::new();
        }
        self.set_focus_opacity(window, false, policy)
    }

    fn set_focus_opacity(&mut self, window: WindowId, focused: bool, policy: &EventPolicy) -> Vec<EventAction> {
        let Some(w) = self.windows.find_any_mut(window) else {
            return Vec::new();
        };
        if w.window_type != WindowType::Normal {
            return Vec::new();
        }
        w.focused = focused;
        let target = if focused { OPAQUE } else { policy.inactive_opacity };
        w.opacity.target = target;
        let current = w.opacity.current as i64;
        self.fades.start(window, current, target as i64, 28);
        w.state = WindowState::Fading;
        Vec::new()
    }

    fn on_error(
        &mut self,
        sequence: u64,
        is_composite_redirect_subwindows: bool,
        decoded_name: String,
    ) -> Vec<EventAction> {
        if self.ignore.should_swallow(sequence) {
            return vec![EventAction::LogSwallowedError { sequence }];
        }
        if is_composite_redirect_subwindows {
            return vec![EventAction::AbortAnotherCompositorRunning];
        }
        vec![EventAction::LogUnswallowedError { decoded_name }]
    }

    /// Advance fades and apply their outcomes to window opacities, returning
    /// actions for any window whose fade completed (spec §4.4, §4.2
    /// MAPPING→MAPPED / *→finalize-unmap / *→finalize-destroy transitions).
    pub fn tick_fades(&mut self, now_ms: u64) -> Vec<EventAction> {
        let outcomes = self.fades.tick(now_ms, 0, OPAQUE as i64);
        let mut actions = Vec::new();
        for (id, outcome) in outcomes {
            let (new_current, completed) = match outcome {
                FadeOutcome::Advancing(c) => (c, false),
                FadeOutcome::Completed(c) => (c, true),
            };
            let Some(w) = self.windows.find_any_mut(id) else {
                continue;
            };
            w.opacity.current = new_current as u32;
            if !completed {
                continue;
            }
            match w.state {
                WindowState::Fading if !w.destroyed => {
                    w.state = WindowState::Mapped;
                }
                WindowState::Unmapping => {
                    w.free_content();
                    w.free_shadow();
                    w.border_size = None;
                    w.clip_changed = true;
                    w.state = WindowState::Unmapped;
                    actions.push(EventAction::FinalizedUnmap { window: id });
                }
                WindowState::Destroying => {
                    self.windows.remove(id);
                    actions.push(EventAction::FinalizedDestroy { window: id });
                }
                _ => {}
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EventPolicy {
        EventPolicy::default()
    }

    #[test]
    fn create_then_map_without_fade_goes_straight_to_mapped() {
        let mut core = Core::new(10);
        core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::CreateNotify {
                window: 1,
                prev_sibling: None,
                geometry: Geometry {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 10,
                    border_width: 0,
                },
                override_redirect: false,
            },
        );
        core.dispatch(
            2,
            0,
            &policy(),
            DecodedEvent::MapNotify {
                window: 1,
                resolved_window_type: WindowType::Normal,
                fade_enabled_for_type: false,
            },
        );
        assert_eq!(core.windows.find(1).unwrap().state, WindowState::Mapped);
    }

    #[test]
    fn create_then_map_with_fade_starts_fading_from_zero() {
        let mut core = Core::new(10);
        core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::CreateNotify {
                window: 1,
                prev_sibling: None,
                geometry: Geometry::default(),
                override_redirect: false,
            },
        );
        core.dispatch(
            2,
            0,
            &policy(),
            DecodedEvent::MapNotify {
                window: 1,
                resolved_window_type: WindowType::Normal,
                fade_enabled_for_type: true,
            },
        );
        let w = core.windows.find(1).unwrap();
        assert_eq!(w.state, WindowState::Fading);
        assert_eq!(w.opacity.current, 0);
        assert!(core.fades.is_fading(1));
    }

    #[test]
    fn destroy_schedules_fade_out_and_frees_damage() {
        let mut core = Core::new(10);
        core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::CreateNotify {
                window: 1,
                prev_sibling: None,
                geometry: Geometry::default(),
                override_redirect: false,
            },
        );
        core.windows.find_any_mut(1).unwrap().damage = Some(99);
        let actions = core.dispatch(2, 0, &policy(), DecodedEvent::DestroyNotify { window: 1 });
        assert!(actions.contains(&EventAction::FreeDamage { window: 1 }));
        assert!(core.windows.find_any(1).unwrap().destroyed);
        assert!(core.windows.find(1).is_none());
    }

    #[test]
    fn fade_completion_finalizes_destroy_and_unlinks() {
        let mut core = Core::new(10);
        core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::CreateNotify {
                window: 1,
                prev_sibling: None,
                geometry: Geometry::default(),
                override_redirect: false,
            },
        );
        core.windows.find_any_mut(1).unwrap().opacity.current = 50;
        core.dispatch(2, 0, &policy(), DecodedEvent::DestroyNotify { window: 1 });
        core.tick_fades(0); // seed clock
        // Fading from 50 to 0 at step 28 completes within two ticks.
        let mut actions = Vec::new();
        for i in 1..5 {
            actions = core.tick_fades(i * 10);
            if !actions.is_empty() {
                break;
            }
        }
        assert!(actions.iter().any(|a| matches!(a, EventAction::FinalizedDestroy { window: 1 })));
        assert!(core.windows.find_any(1).is_none());
    }

    #[test]
    fn circulate_place_on_top_restacks() {
        let mut core = Core::new(10);
        for id in [1, 2, 3] {
            core.dispatch(
                id as u64,
                0,
                &policy(),
                DecodedEvent::CreateNotify {
                    window: id,
                    prev_sibling: if id == 1 { None } else { Some(id - 1) },
                    geometry: Geometry::default(),
                    override_redirect: false,
                },
            );
        }
        core.dispatch(
            10,
            0,
            &policy(),
            DecodedEvent::CirculateNotify {
                window: 1,
                place_on_top: true,
            },
        );
        assert_eq!(core.windows.stacking_order(), &[2, 3, 1]);
    }

    #[test]
    fn error_matching_ignore_log_is_swallowed() {
        let mut core = Core::new(10);
        core.ignore.push(5);
        let actions = core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::Error {
                sequence: 5,
                is_composite_redirect_subwindows: false,
                decoded_name: "BadWindow".into(),
            },
        );
        assert_eq!(actions, vec![EventAction::LogSwallowedError { sequence: 5 }]);
    }

    #[test]
    fn composite_redirect_subwindows_error_aborts() {
        let mut core = Core::new(10);
        let actions = core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::Error {
                sequence: 1,
                is_composite_redirect_subwindows: true,
                decoded_name: "Access".into(),
            },
        );
        assert_eq!(actions, vec![EventAction::AbortAnotherCompositorRunning]);
    }

    #[test]
    fn root_background_property_invalidates_tile() {
        let mut core = Core::new(10);
        let actions = core.dispatch(
            1,
            0,
            &policy(),
            DecodedEvent::PropertyNotify {
                window: 0,
                is_root: true,
                kind: PropertyKind::RootBackground,
            },
        );
        assert_eq!(actions, vec![EventAction::InvalidateRootTile]);
        assert!(core.root_tile_dirty);
    }
}
