//! Configuration collaborator (spec §6.3, §10.3): a parsed, `serde`-backed
//! structure the core only ever reads. Loading/parsing the TOML file is a
//! thin wrapper kept out of the core proper, matching the `Default`-first,
//! override-by-field style of `lib/src/testing/config.rs`'s harness config
//! and `elucidsoft-ori_term`'s use of `toml` for its own config file
//! (sensible built-in defaults, overridden field-by-field by whatever the
//! file or CLI supplies).

use std::collections::HashMap;

use serde::Deserialize;

use crate::window::WindowType;

/// Per-window-type values keyed by the EWMH type name used in
/// `Atoms::window_type_from_property` (spec §6.3's `wintype_*` tables).
#[derive(Debug, Clone, Deserialize)]
pub struct WindowTypeConfig {
    #[serde(default = "default_true")]
    pub shadow: bool,
    #[serde(default = "default_true")]
    pub fade: bool,
    #[serde(default = "default_opaque_f64")]
    pub opacity: f64,
}

impl Default for WindowTypeConfig {
    fn default() -> Self {
        Self {
            shadow: true,
            fade: true,
            opacity: 1.0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_opaque_f64() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shadow_radius: u32,
    pub shadow_opacity: f64,
    pub shadow_offset_x: i32,
    pub shadow_offset_y: i32,
    pub clear_shadow: bool,

    pub fade_in_step: f64,
    pub fade_out_step: f64,
    pub fade_delta_ms: u64,
    pub fades_enabled: bool,

    pub inactive_opacity: f64,
    pub frame_opacity: f64,

    pub daemonize: bool,
    pub synchronous: bool,
    pub display: Option<String>,

    #[serde(skip)]
    pub wintypes: HashMap<WindowTypeKey, WindowTypeConfig>,
}

/// `WindowType` isn't `Hash`/`Eq` by derive in a way `serde` can key a map
/// on directly from TOML (TOML keys are strings); this mirrors
/// `window_type` 1:1 and is what `wintypes` is actually keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowTypeKey(pub WindowType);

impl Default for Config {
    fn default() -> Self {
        let mut wintypes = HashMap::new();
        for t in WindowType::ALL {
            let mut c = WindowTypeConfig::default();
            if matches!(t, WindowType::Desktop | WindowType::Dock) {
                c.shadow = false;
            }
            wintypes.insert(WindowTypeKey(t), c);
        }
        Self {
            shadow_radius: 12,
            shadow_opacity: 0.75,
            shadow_offset_x: -15,
            shadow_offset_y: -15,
            clear_shadow: false,
            fade_in_step: 0.028,
            fade_out_step: 0.028,
            fade_delta_ms: 10,
            fades_enabled: true,
            inactive_opacity: 1.0,
            frame_opacity: 1.0,
            daemonize: false,
            synchronous: false,
            display: None,
            wintypes,
        }
    }
}

impl Config {
    pub fn wintype(&self, t: WindowType) -> WindowTypeConfig {
        self.wintypes
            .get(&WindowTypeKey(t))
            .cloned()
            .unwrap_or_default()
    }

    /// Parse from a TOML document, falling back to defaults for any
    /// unspecified field (spec §10.3).
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_shadow_for_desktop_and_dock() {
        let cfg = Config::default();
        assert!(!cfg.wintype(WindowType::Desktop).shadow);
        assert!(!cfg.wintype(WindowType::Dock).shadow);
        assert!(cfg.wintype(WindowType::Normal).shadow);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.shadow_radius, 12);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = Config::from_toml_str("shadow_radius = 20\n").unwrap();
        assert_eq!(cfg.shadow_radius, 20);
        assert_eq!(cfg.fade_delta_ms, 10);
    }
}
