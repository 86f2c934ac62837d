//! CLI surface (spec §6.4, §10.4): flags that assemble a [`Config`],
//! following the `clap` derive style the teacher's `userland` binaries use
//! for their own argument parsing.

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "compmgrd", about = "X11 compositing manager")]
pub struct Cli {
    /// Shadow kernel radius in pixels.
    #[arg(short = 'r', long)]
    pub shadow_radius: Option<u32>,

    /// Shadow opacity in [0,1].
    #[arg(short = 'o', long)]
    pub shadow_opacity: Option<f64>,

    /// Shadow horizontal offset.
    #[arg(short = 'l', long)]
    pub shadow_offset_x: Option<i32>,

    /// Shadow vertical offset.
    #[arg(short = 't', long)]
    pub shadow_offset_y: Option<i32>,

    /// Fade-in step.
    #[arg(short = 'I', long)]
    pub fade_in_step: Option<f64>,

    /// Fade-out step.
    #[arg(short = 'O', long)]
    pub fade_out_step: Option<f64>,

    /// Fade tick period in milliseconds.
    #[arg(short = 'D', long)]
    pub fade_delta_ms: Option<u64>,

    /// Inactive-window opacity (0 disables).
    #[arg(short = 'i', long)]
    pub inactive_opacity: Option<f64>,

    /// Frame opacity (0 disables five-region frame paint).
    #[arg(short = 'e', long)]
    pub frame_opacity: Option<f64>,

    /// Enable client-side shadows.
    #[arg(short = 'c', long)]
    pub shadows: bool,

    /// Disable shadow on dock windows.
    #[arg(short = 'C', long)]
    pub no_dock_shadow: bool,

    /// Disable shadow on drag-and-drop windows.
    #[arg(short = 'G', long)]
    pub no_dnd_shadow: bool,

    /// Clear the shadow directly beneath the window.
    #[arg(short = 'z', long)]
    pub clear_shadow: bool,

    /// Enable fades.
    #[arg(short = 'f', long)]
    pub fades: bool,

    /// Daemonize after startup.
    #[arg(short = 'b', long)]
    pub daemonize: bool,

    /// Request a synchronous X connection (debugging).
    #[arg(short = 'S', long)]
    pub synchronous: bool,

    /// X display name, e.g. `:0`.
    #[arg(short = 'd', long)]
    pub display: Option<String>,

    /// TOML config file to load before applying the flags above.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease log verbosity (repeatable).
    #[arg(short = 'q', long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Apply this CLI's flags on top of a config (CLI wins field-by-field;
    /// spec §10.4: "CLI values override config-file values").
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(v) = self.shadow_radius {
            config.shadow_radius = v;
        }
        if let Some(v) = self.shadow_opacity {
            config.shadow_opacity = v;
        }
        if let Some(v) = self.shadow_offset_x {
            config.shadow_offset_x = v;
        }
        if let Some(v) = self.shadow_offset_y {
            config.shadow_offset_y = v;
        }
        if let Some(v) = self.fade_in_step {
            config.fade_in_step = v;
        }
        if let Some(v) = self.fade_out_step {
            config.fade_out_step = v;
        }
        if let Some(v) = self.fade_delta_ms {
            config.fade_delta_ms = v;
        }
        if let Some(v) = self.inactive_opacity {
            config.inactive_opacity = v;
        }
        if let Some(v) = self.frame_opacity {
            config.frame_opacity = v;
        }
        if self.clear_shadow {
            config.clear_shadow = true;
        }
        if self.fades {
            config.fades_enabled = true;
        }
        if self.daemonize {
            config.daemonize = true;
        }
        if self.synchronous {
            config.synchronous = true;
        }
        if self.display.is_some() {
            config.display = self.display.clone();
        }
        if self.no_dock_shadow {
            if let Some(c) = config.wintypes.get_mut(&crate::config::WindowTypeKey(
                crate::window::WindowType::Dock,
            )) {
                c.shadow = false;
            }
        }
        if self.no_dnd_shadow {
            if let Some(c) = config.wintypes.get_mut(&crate::config::WindowTypeKey(
                crate::window::WindowType::Dnd,
            )) {
                c.shadow = false;
            }
        }
        config
    }

    /// Net verbosity, `-v` minus `-q`, clamped like `tracing_subscriber`'s
    /// env-filter directive levels expect (spec §10.1/§10.4).
    pub fn verbosity(&self) -> i8 {
        self.verbose as i8 - self.quiet as i8
    }
}
