//! Root tile resolution (spec §4.8, §8 item 7).
//!
//! Grounded on the atom-decoding split in `atoms.rs`: the property fetch
//! itself is I/O, but "which pixmap id (if any) to use" is a pure decision
//! given what was already fetched, so it lives here as plain data in/out.

use crate::window::PixmapId;

/// 50% gray, alpha opaque — the spec's literal fallback fill (spec §4.8:
/// "RGB 0x8080, alpha 0xffff").
pub const FALLBACK_GRAY: crate::backend::Rgba8 = crate::backend::Rgba8 {
    r: 0x80,
    g: 0x80,
    b: 0x80,
    a: 0xff,
};

/// What to do to (re)build the root tile picture, given the two candidate
/// property values already fetched by the caller (spec §4.8: try
/// `_XROOTPMAP_ID` then `_XSETROOT_ID`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootTilePlan {
    /// Wrap this existing pixmap in a repeating picture.
    UseExisting(PixmapId),
    /// No usable property; allocate a 1×1 pixmap filled with `FALLBACK_GRAY`.
    Fallback,
}

pub fn resolve_root_tile(xrootpmap_id: Option<PixmapId>, xsetroot_id: Option<PixmapId>) -> RootTilePlan {
    match xrootpmap_id.or(xsetroot_id) {
        Some(pixmap) => RootTilePlan::UseExisting(pixmap),
        None => RootTilePlan::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_xrootpmap_id_over_xsetroot_id() {
        assert_eq!(
            resolve_root_tile(Some(7), Some(9)),
            RootTilePlan::UseExisting(7)
        );
    }

    #[test]
    fn falls_back_to_xsetroot_id() {
        assert_eq!(resolve_root_tile(None, Some(9)), RootTilePlan::UseExisting(9));
    }

    #[test]
    fn falls_back_to_gray_fill_when_neither_set() {
        assert_eq!(resolve_root_tile(None, None), RootTilePlan::Fallback);
    }
}
