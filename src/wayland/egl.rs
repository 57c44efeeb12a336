use anyhow::{anyhow, Result};
use khronos_egl as egl;
use std::ffi::c_void;
use std::ptr;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::Proxy;

/// GLES2 context bound to one layer surface.
pub struct EglContext {
    egl: egl::Instance<egl::Static>,
    display: egl::Display,
    context: egl::Context,
    config: egl::Config,
    window: Option<wayland_egl::WlEglSurface>,
    surface: Option<egl::Surface>,
}

impl EglContext {
    pub fn new(wl_display: *mut c_void) -> Result<Self> {
        let instance = egl::Instance::new(egl::Static);

        let display = unsafe {
            instance
                .get_display(wl_display as egl::NativeDisplayType)
                .ok_or_else(|| anyhow!("Failed to get EGL display"))?
        };

        let (major, minor) = instance.initialize(display)?;
        log::info!("EGL version: {}.{}", major, minor);

        // Alpha is required; the desktop shows through once the backdrop fades.
        let config_attribs = [
            egl::SURFACE_TYPE, egl::WINDOW_BIT,
            egl::RED_SIZE, 8,
            egl::GREEN_SIZE, 8,
            egl::BLUE_SIZE, 8,
            egl::ALPHA_SIZE, 8,
            egl::RENDERABLE_TYPE, egl::OPENGL_ES2_BIT,
            egl::NONE,
        ];

        let config = instance
            .choose_first_config(display, &config_attribs)?
            .ok_or_else(|| anyhow!("No EGL config with alpha found"))?;

        instance.bind_api(egl::OPENGL_ES_API)?;

        let context_attribs = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        let context = instance.create_context(display, config, None, &context_attribs)?;

        Ok(Self {
            egl: instance,
            display,
            context,
            config,
            window: None,
            surface: None,
        })
    }

    pub fn create_surface(&mut self, wl_surface: &WlSurface, width: i32, height: i32) -> Result<()> {
        if let Some(surface) = self.surface.take() {
            self.egl.destroy_surface(self.display, surface)?;
        }
        self.window = None;

        let window = unsafe {
            wayland_egl::WlEglSurface::new_from_raw(wl_surface.id().as_ptr() as *mut _, width, height)?
        };

        let surface = unsafe {
            self.egl.create_window_surface(
                self.display,
                self.config,
                window.ptr() as egl::NativeWindowType,
                None,
            )?
        };

        self.window = Some(window);
        self.surface = Some(surface);
        self.make_current()?;

        // The frame loop paces itself; never block in swap.
        if let Err(e) = self.egl.swap_interval(self.display, 0) {
            log::debug!("swap_interval(0) unsupported: {}", e);
        }

        Ok(())
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        if let Some(window) = &mut self.window {
            window.resize(width, height, 0, 0);
        }
    }

    pub fn swap_buffers(&self) -> Result<()> {
        if let Some(surface) = self.surface {
            self.egl.swap_buffers(self.display, surface)?;
        }
        Ok(())
    }

    pub fn make_current(&self) -> Result<()> {
        if let Some(surface) = self.surface {
            self.egl
                .make_current(self.display, Some(surface), Some(surface), Some(self.context))?;
        }
        Ok(())
    }

    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        self.egl
            .get_proc_address(name)
            .map(|f| f as *const c_void)
            .unwrap_or(ptr::null())
    }
}

impl Drop for EglContext {
    fn drop(&mut self) {
        let _ = self.egl.make_current(self.display, None, None, None);
        if let Some(surface) = self.surface.take() {
            let _ = self.egl.destroy_surface(self.display, surface);
        }
        let _ = self.egl.destroy_context(self.display, self.context);
        let _ = self.egl.terminate(self.display);
    }
}
