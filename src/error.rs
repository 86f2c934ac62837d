//! Typed errors the core itself raises (spec §7): a per-subsystem
//! `thiserror` enum, the same consolidated-enum shape `mm/src/error.rs`
//! uses for its memory-management errors, bubbled to a caller-level
//! `anyhow::Result` the way `panxinmiao-myth`'s `errors.rs` does for its
//! own `thiserror::Error` enum.
//!
//! X errors that race destroyed resources (`BadWindow`/`BadPixmap`/
//! `BadDamage`/`BadPicture`/`BadRegion`) are *not* represented here — they
//! are data handled entirely by [`crate::ignore::IgnoreLog`] and never
//! surface as a `Result::Err` (spec §7: "recoverable errors never escape
//! the event dispatch").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("required X extension missing: {0}")]
    MissingExtension(&'static str),

    #[error("another composite manager is already running")]
    AnotherCompositorRunning,

    #[error("failed to allocate shadow raster for window {window}")]
    ShadowAllocFailed { window: crate::window::WindowId },

    #[error("property {property} on window {window} missing or wrong type")]
    PropertyDecode {
        window: crate::window::WindowId,
        property: &'static str,
    },
}
