//! Binary entry point: parses the CLI, loads config, installs logging, and
//! runs the main loop (spec §10.1, §10.3, §10.4).

use std::cell::RefCell;
use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use compmgrd::backend::RendererBackend;
use compmgrd::cli::Cli;
use compmgrd::config::Config;
use compmgrd::events::{Core, EventAction, EventPolicy};
use compmgrd::mainloop::Clock;
use compmgrd::paint::{plan_paint, PlannerPolicy, ScreenBounds};
use compmgrd::render::paint_frame;
use compmgrd::root_tile::RootTilePlan;
use compmgrd::window::{PictureId, PixmapId, Window, OPAQUE};
use compmgrd::xconn::XConn;
use compmgrd::xrender_backend::XRenderBackend;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use x11rb::protocol::xproto::ConnectionExt as _;

/// The off-screen buffer the painter composes into before it's blitted to
/// the overlay window (spec §4.7/§4.10); sized to the root window and
/// recreated whenever `DiscardBackBuffer` fires (root `ConfigureNotify`).
struct Buffer {
    pixmap: PixmapId,
    picture: PictureId,
}

impl Buffer {
    fn create(backend: &mut XRenderBackend, width: u32, height: u32) -> Self {
        let pixmap = backend.create_pixmap(width, height, 32);
        let picture = backend.create_picture_over_drawable(pixmap, true);
        Self { pixmap, picture }
    }

    fn destroy(self, backend: &mut XRenderBackend) {
        backend.free_picture(self.picture);
        backend.free_pixmap(self.pixmap);
    }
}

/// Current root window size, queried fresh each time rather than cached
/// from connection setup so a resize (RANDR or otherwise) is picked up.
fn root_size(xconn: &XConn) -> Result<(u32, u32)> {
    let geom = xconn.conn.get_geometry(xconn.root)?.reply()?;
    Ok((geom.width as u32, geom.height as u32))
}

/// (Re)resolve the root tile picture per spec §4.8.
fn build_root_tile(xconn: &XConn, backend: &mut XRenderBackend) -> Result<PictureId> {
    let (xrootpmap_id, xsetroot_id) = xconn.fetch_root_tile_ids()?;
    Ok(
        match compmgrd::root_tile::resolve_root_tile(xrootpmap_id, xsetroot_id) {
            RootTilePlan::UseExisting(pixmap) => backend.create_picture_over_drawable(pixmap, false),
            RootTilePlan::Fallback => backend.create_repeating_1x1_picture(compmgrd::root_tile::FALLBACK_GRAY),
        },
    )
}

struct ConfigPolicy<'a> {
    config: &'a Config,
}

impl PlannerPolicy for ConfigPolicy<'_> {
    fn is_blacklisted(&self, _window: &Window) -> bool {
        false
    }

    fn shadow_enabled(&self, window: &Window) -> bool {
        self.config.wintype(window.window_type).shadow
    }
}

fn install_logging(verbosity: i8) {
    let default_directive = match verbosity {
        i8::MIN..=-1 => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Config::from_toml_str(&text)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => Config::default(),
    };
    Ok(cli.apply(base))
}

fn policy_from_config(config: &Config) -> EventPolicy {
    EventPolicy {
        fade_in_step: (config.fade_in_step * OPAQUE as f64) as i64,
        fade_out_step: (config.fade_out_step * OPAQUE as f64) as i64,
        inactive_opacity_enabled: config.inactive_opacity < 1.0,
        inactive_opacity: (config.inactive_opacity * OPAQUE as f64) as u32,
    }
}

fn main() {
    let cli = Cli::parse();
    install_logging(cli.verbosity());

    if let Err(e) = run(cli) {
        eprintln!("compmgrd: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!(?config.shadow_radius, ?config.fade_delta_ms, "loaded configuration");

    let xconn = XConn::connect(config.display.as_deref())
        .context("failed to initialize the X connection")?;

    let mut core = Core::new(config.fade_delta_ms);
    let policy = policy_from_config(&config);
    // Reserved for per-window shadow raster assembly once a window's shadow
    // texture is (re)built; threading it through the paint pipeline itself
    // is a separate piece of work from this loop's buffer/target plumbing.
    let _shadow_tables = compmgrd::shadow::ShadowTables::build(config.shadow_radius);

    let mut backend = XRenderBackend::new(&xconn.conn, xconn.root)
        .context("failed to initialize the renderer backend")?;
    let (screen_w, screen_h) = root_size(&xconn)?;
    let buffer = Buffer::create(&mut backend, screen_w, screen_h);
    let target_picture = backend.create_picture_over_drawable(xconn.overlay_window, false);
    let mut root_tile_picture = build_root_tile(&xconn, &mut backend)?;

    let backend_cell = RefCell::new(backend);
    let buffer_cell = RefCell::new(buffer);

    let clock = Clock::new();

    compmgrd::mainloop::run(
        &xconn,
        &mut core,
        &policy,
        &clock,
        |core, xconn, actions| {
            for action in actions {
                match action {
                    EventAction::SelectWindowInput { window } => {
                        let _ = xconn.select_window_input(*window);
                    }
                    EventAction::InvalidateRootTile => {
                        core.root_tile_dirty = true;
                    }
                    EventAction::DiscardBackBuffer => {
                        if let Ok((w, h)) = root_size(xconn) {
                            let mut backend = backend_cell.borrow_mut();
                            let new_buffer = Buffer::create(&mut backend, w, h);
                            let old_buffer = std::mem::replace(&mut *buffer_cell.borrow_mut(), new_buffer);
                            old_buffer.destroy(&mut backend);
                        }
                    }
                    EventAction::LogUnswallowedError { decoded_name } => {
                        error!(error = %decoded_name, "unhandled X error");
                    }
                    EventAction::AbortAnotherCompositorRunning
                    | EventAction::FreeDamage { .. }
                    | EventAction::LogSwallowedError { .. }
                    | EventAction::FinalizedDestroy { .. }
                    | EventAction::FinalizedUnmap { .. } => {}
                }
            }
            Ok(())
        },
        |core, xconn| {
            let policy = ConfigPolicy { config: &config };
            let setup = xconn.conn.setup();
            let screen = &setup.roots[xconn.screen_num];
            let bounds = ScreenBounds {
                width: screen.width_in_pixels as i32,
                height: screen.height_in_pixels as i32,
            };
            let entries = plan_paint(&mut core.windows, bounds, &policy);

            let mut backend = backend_cell.borrow_mut();
            if core.root_tile_dirty {
                if let Ok(tile) = build_root_tile(xconn, &mut backend) {
                    backend.free_picture(root_tile_picture);
                    root_tile_picture = tile;
                }
                core.root_tile_dirty = false;
            }

            let repaint = core.damage.region().clone();
            let buffer = buffer_cell.borrow();
            paint_frame(
                &mut core.windows,
                &entries,
                buffer.picture,
                &repaint,
                root_tile_picture,
                target_picture,
                &mut *backend,
            );
            xconn.flush()
        },
    )
}
