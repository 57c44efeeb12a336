pub mod egl;

use candlelight::app::{UiEvent, BTN_LEFT, KEY_ESCAPE, KEY_SPACE};
use glam::Vec2;
use log::{debug, info, warn};
use wayland_client::{
    protocol::{wl_compositor, wl_keyboard, wl_pointer, wl_registry, wl_seat, wl_shm, wl_surface},
    Connection, Dispatch, QueueHandle, WEnum,
};
use wayland_cursor::CursorTheme;
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};
use xkbcommon::xkb;

/// evdev codes used when the compositor sends no usable keymap.
const EVDEV_ESC: u32 = 1;
const EVDEV_SPACE: u32 = 57;
const CURSOR_SIZE: u32 = 24;

pub struct WaylandState {
    pub running: bool,
    pub configured: bool,
    pub size: [u32; 2],
    pub compositor: Option<wl_compositor::WlCompositor>,
    pub layer_shell: Option<zwlr_layer_shell_v1::ZwlrLayerShellV1>,
    pub shm: Option<wl_shm::WlShm>,
    pub surface: Option<wl_surface::WlSurface>,
    pub layer_surface: Option<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1>,
    pub seat: Option<wl_seat::WlSeat>,
    pub pointer: Option<wl_pointer::WlPointer>,
    pub keyboard: Option<wl_keyboard::WlKeyboard>,
    pub surface_pos: Vec2,
    pub pending_events: Vec<UiEvent>,

    xkb_context: xkb::Context,
    xkb_state: Option<xkb::State>,

    cursor_theme: Option<CursorTheme>,
    cursor_surface: Option<wl_surface::WlSurface>,
    cursor_name: Option<&'static str>,
    enter_serial: Option<u32>,
}

impl WaylandState {
    pub fn new() -> Self {
        Self {
            running: true,
            configured: false,
            size: [0, 0],
            compositor: None,
            layer_shell: None,
            shm: None,
            surface: None,
            layer_surface: None,
            seat: None,
            pointer: None,
            keyboard: None,
            surface_pos: Vec2::new(0.0, 0.0),
            pending_events: Vec::new(),
            xkb_context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            xkb_state: None,
            cursor_theme: None,
            cursor_surface: None,
            cursor_name: None,
            enter_serial: None,
        }
    }

    /// Shows the named cursor while the pointer is over our surface.
    /// Repeated calls with the same name are free.
    pub fn set_cursor(&mut self, conn: &Connection, qh: &QueueHandle<Self>, name: &'static str) {
        if self.cursor_name == Some(name) {
            return;
        }
        let (Some(pointer), Some(serial)) = (self.pointer.clone(), self.enter_serial) else {
            return;
        };

        if self.cursor_theme.is_none() {
            let Some(shm) = self.shm.clone() else {
                return;
            };
            match CursorTheme::load(conn, shm, CURSOR_SIZE) {
                Ok(theme) => self.cursor_theme = Some(theme),
                Err(e) => {
                    warn!("Failed to load cursor theme: {}", e);
                    return;
                }
            }
        }
        if self.cursor_surface.is_none() {
            if let Some(compositor) = &self.compositor {
                self.cursor_surface = Some(compositor.create_surface(qh, ()));
            }
        }

        let (Some(theme), Some(surface)) = (self.cursor_theme.as_mut(), &self.cursor_surface) else {
            return;
        };
        let Some(cursor) = theme.get_cursor(name) else {
            debug!("Cursor '{}' not in theme", name);
            return;
        };
        let image = &cursor[0];
        let (hx, hy) = image.hotspot();
        surface.attach(Some(&**image), 0, 0);
        let (w, h) = image.dimensions();
        surface.damage_buffer(0, 0, w as i32, h as i32);
        surface.commit();
        pointer.set_cursor(serial, Some(surface), hx as i32, hy as i32);
        self.cursor_name = Some(name);
    }

    fn keysym_for(&self, evdev: u32) -> u32 {
        if let Some(xkb_state) = &self.xkb_state {
            let sym = xkb_state.key_get_one_sym(xkb::Keycode::new(evdev + 8));
            if sym.raw() != 0 {
                return sym.raw();
            }
        }
        match evdev {
            EVDEV_SPACE => KEY_SPACE,
            EVDEV_ESC => KEY_ESCAPE,
            other => other,
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            match &interface[..] {
                "wl_compositor" => {
                    let compositor =
                        registry.bind::<wl_compositor::WlCompositor, _, _>(name, version.min(4), qh, ());
                    state.compositor = Some(compositor);
                }
                "zwlr_layer_shell_v1" => {
                    let layer_shell = registry.bind::<zwlr_layer_shell_v1::ZwlrLayerShellV1, _, _>(
                        name,
                        version.min(4),
                        qh,
                        (),
                    );
                    state.layer_shell = Some(layer_shell);
                }
                "wl_shm" => {
                    state.shm = Some(registry.bind::<wl_shm::WlShm, _, _>(name, 1, qh, ()));
                }
                "wl_seat" => {
                    let seat = registry.bind::<wl_seat::WlSeat, _, _>(name, version.min(5), qh, ());
                    state.seat = Some(seat);
                }
                _ => {}
            }
        }
    }
}

impl Dispatch<wl_compositor::WlCompositor, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_compositor::WlCompositor, _: wl_compositor::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_surface::WlSurface, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_surface::WlSurface, _: wl_surface::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_shm::WlShm, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_shm::WlShm, _: wl_shm::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_pointer::WlPointer, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &wl_pointer::WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter { serial, surface_x, surface_y, .. } => {
                state.enter_serial = Some(serial);
                // The compositor resets the cursor image on enter.
                state.cursor_name = None;
                state.surface_pos = Vec2::new(surface_x as f32, surface_y as f32);
                state.pending_events.push(UiEvent::PointerEnter { pos: state.surface_pos });
            }
            wl_pointer::Event::Leave { .. } => {
                state.enter_serial = None;
                state.pending_events.push(UiEvent::PointerLeave);
            }
            wl_pointer::Event::Motion { surface_x, surface_y, .. } => {
                state.surface_pos = Vec2::new(surface_x as f32, surface_y as f32);
                state.pending_events.push(UiEvent::PointerMove { pos: state.surface_pos });
            }
            wl_pointer::Event::Button { button, state: btn_state, .. } => {
                if button != BTN_LEFT {
                    return;
                }
                let ev = match btn_state {
                    WEnum::Value(wl_pointer::ButtonState::Pressed) => {
                        UiEvent::PointerDown { pos: state.surface_pos, button }
                    }
                    WEnum::Value(wl_pointer::ButtonState::Released) => UiEvent::PointerUp { button },
                    _ => return,
                };
                state.pending_events.push(ev);
            }
            wl_pointer::Event::Axis { axis, value, .. } => {
                if let WEnum::Value(wl_pointer::Axis::VerticalScroll) = axis {
                    if value != 0.0 {
                        // Positive is wheel down.
                        state.pending_events.push(UiEvent::Scroll { delta: value.signum() as f32 });
                    }
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for WaylandState {
    fn event(
        state: &mut Self,
        seat: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(caps),
        } = event
        {
            if caps.contains(wl_seat::Capability::Pointer) && state.pointer.is_none() {
                state.pointer = Some(seat.get_pointer(qh, ()));
            }
            if caps.contains(wl_seat::Capability::Keyboard) && state.keyboard.is_none() {
                state.keyboard = Some(seat.get_keyboard(qh, ()));
            }
        }
    }
}

impl Dispatch<wl_keyboard::WlKeyboard, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &wl_keyboard::WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format != WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) {
                    warn!("Unsupported keymap format, using evdev fallback");
                    return;
                }
                let keymap = unsafe {
                    xkb::Keymap::new_from_fd(
                        &state.xkb_context,
                        fd,
                        size as usize,
                        xkb::KEYMAP_FORMAT_TEXT_V1,
                        xkb::KEYMAP_COMPILE_NO_FLAGS,
                    )
                };
                match keymap {
                    Ok(Some(keymap)) => {
                        state.xkb_state = Some(xkb::State::new(&keymap));
                        debug!("Keymap loaded");
                    }
                    Ok(None) => warn!("Keymap failed to compile, using evdev fallback"),
                    Err(e) => warn!("Failed to read keymap: {}", e),
                }
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => {
                if let Some(xkb_state) = &mut state.xkb_state {
                    xkb_state.update_mask(mods_depressed, mods_latched, mods_locked, 0, 0, group);
                }
            }
            wl_keyboard::Event::Key {
                key,
                state: WEnum::Value(wl_keyboard::KeyState::Pressed),
                ..
            } => {
                let sym = state.keysym_for(key);
                state.pending_events.push(UiEvent::Key(sym));
            }
            _ => {}
        }
    }
}

impl Dispatch<zwlr_layer_shell_v1::ZwlrLayerShellV1, ()> for WaylandState {
    fn event(_: &mut Self, _: &zwlr_layer_shell_v1::ZwlrLayerShellV1, _: zwlr_layer_shell_v1::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        surface: &zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure { serial, width, height } => {
                debug!("Layer surface configured: {}x{} (serial {})", width, height, serial);
                if width > 0 && height > 0 {
                    state.size = [width, height];
                }
                surface.ack_configure(serial);
                state.configured = true;
            }
            zwlr_layer_surface_v1::Event::Closed => {
                info!("Layer surface closed by compositor");
                state.running = false;
            }
            _ => {}
        }
    }
}
