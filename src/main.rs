mod wayland;

use anyhow::{anyhow, Result};
use candlelight::app::App;
use candlelight::config::Config;
use candlelight::gfx::{draw::DrawContext, gl::load_scene_program, math::Color};
use log::{info, warn};
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use wayland::egl::EglContext;
use wayland::WaylandState;
use wayland_client::backend::WaylandError;
use wayland_client::{Connection, Proxy};
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

const CURSOR_DEFAULT: &str = "left_ptr";
const CURSOR_HAND: &str = "hand2";

fn main() -> Result<()> {
    env_logger::init();
    info!("Starting candlelight...");

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });
    let frame_budget = Duration::from_millis(1000 / u64::from(config.fps_cap.max(1)));
    let mut app = App::new(config)?;

    let conn = Connection::connect_to_env()?;
    let display = conn.display();
    let mut event_queue = conn.new_event_queue();
    let qh = event_queue.handle();
    let _registry = display.get_registry(&qh, ());

    let mut state = WaylandState::new();
    event_queue.roundtrip(&mut state)?;

    let compositor = state
        .compositor
        .clone()
        .ok_or_else(|| anyhow!("Compositor does not offer wl_compositor"))?;
    let layer_shell = state
        .layer_shell
        .clone()
        .ok_or_else(|| anyhow!("Compositor does not support wlr-layer-shell"))?;

    // One transparent surface covering the whole output.
    let surface = compositor.create_surface(&qh, ());
    let layer_surface = layer_shell.get_layer_surface(
        &surface,
        None,
        zwlr_layer_shell_v1::Layer::Overlay,
        "candlelight".to_string(),
        &qh,
        (),
    );
    layer_surface.set_anchor(
        zwlr_layer_surface_v1::Anchor::Top
            | zwlr_layer_surface_v1::Anchor::Bottom
            | zwlr_layer_surface_v1::Anchor::Left
            | zwlr_layer_surface_v1::Anchor::Right,
    );
    layer_surface.set_exclusive_zone(-1);
    layer_surface.set_size(0, 0);
    layer_surface.set_keyboard_interactivity(zwlr_layer_surface_v1::KeyboardInteractivity::Exclusive);
    surface.commit();
    state.surface = Some(surface.clone());
    state.layer_surface = Some(layer_surface);

    while !state.configured {
        event_queue.blocking_dispatch(&mut state)?;
    }
    if state.size == [0, 0] {
        return Err(anyhow!("Compositor configured a zero-sized surface"));
    }
    info!("Surface configured at {}x{}", state.size[0], state.size[1]);

    let display_ptr = display.id().as_ptr() as *mut _;
    let mut egl = EglContext::new(display_ptr)?;
    egl.create_surface(&surface, state.size[0] as i32, state.size[1] as i32)?;

    let gl = unsafe { glow::Context::from_loader_function(|s| egl.get_proc_address(s)) };
    let program = load_scene_program(&gl)?;
    let mut draw = DrawContext::new(gl, program)?;

    let mut size = state.size;
    app.set_viewport(size);
    let mut last_frame = Instant::now();

    info!("Press space to begin, escape to quit");
    while state.running && app.is_running() {
        let frame_start = Instant::now();
        event_queue.dispatch_pending(&mut state)?;
        conn.flush()?;

        for ev in state.pending_events.drain(..) {
            app.handle_event(ev);
        }

        let cursor = if app.wants_hand_cursor() {
            CURSOR_HAND
        } else {
            CURSOR_DEFAULT
        };
        state.set_cursor(&conn, &qh, cursor);

        if state.size != size {
            size = state.size;
            egl.resize(size[0] as i32, size[1] as i32);
            app.set_viewport(size);
            info!("Resized to {}x{}", size[0], size[1]);
        }

        let dt = frame_start.duration_since(last_frame).as_secs_f32();
        last_frame = frame_start;
        app.update(dt);

        egl.make_current()?;
        draw.begin([size[0] as f32, size[1] as f32], Color::new(0.0, 0.0, 0.0, 0.0));
        app.render(&mut draw);
        egl.swap_buffers()?;

        if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }

        // Pick up events that arrived while sleeping.
        if let Some(guard) = event_queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!("Goodbye");
    Ok(())
}
