use super::font;
use super::math::Color;
use anyhow::Result;
use glam::Vec2;
use glow::HasContext;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Shader effect selected per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Effect {
    Solid = 0,
    /// Soft radial falloff from the quad centre, used for flames and sparks.
    Glow = 1,
    /// Vertical gradient from `uColor` at the top to transparent.
    Sky = 2,
}

pub struct DrawContext {
    gl: glow::Context,
    program: glow::Program,
    vbo: glow::Buffer,
    vertices: Vec<Vertex>,
    viewport: [f32; 2],
    color: Color,
    effect: Effect,

    u_viewport: Option<glow::UniformLocation>,
    u_color: Option<glow::UniformLocation>,
    u_time: Option<glow::UniformLocation>,
    u_effect_mode: Option<glow::UniformLocation>,
    a_pos: Option<u32>,
    a_uv: Option<u32>,
}

impl DrawContext {
    pub fn new(gl: glow::Context, program: glow::Program) -> Result<Self> {
        let vbo = unsafe {
            gl.create_buffer()
                .map_err(|e| anyhow::anyhow!("Failed to create buffer: {}", e))?
        };

        let u_viewport = unsafe { gl.get_uniform_location(program, "uViewport") };
        let u_color = unsafe { gl.get_uniform_location(program, "uColor") };
        let u_time = unsafe { gl.get_uniform_location(program, "uTime") };
        let u_effect_mode = unsafe { gl.get_uniform_location(program, "uEffectMode") };
        let a_pos = unsafe { gl.get_attrib_location(program, "aPos") };
        let a_uv = unsafe { gl.get_attrib_location(program, "aUV") };

        Ok(Self {
            gl,
            program,
            vbo,
            vertices: Vec::with_capacity(4096),
            viewport: [800.0, 600.0],
            color: Color::new(1.0, 1.0, 1.0, 1.0),
            effect: Effect::Solid,
            u_viewport,
            u_color,
            u_time,
            u_effect_mode,
            a_pos,
            a_uv,
        })
    }

    pub fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    /// Starts a frame cleared to `clear` (premultiplied alpha is not used).
    pub fn begin(&mut self, viewport_px: [f32; 2], clear: Color) {
        self.viewport = viewport_px;
        self.vertices.clear();
        self.effect = Effect::Solid;
        self.color = Color::new(1.0, 1.0, 1.0, 1.0);

        unsafe {
            self.gl.viewport(0, 0, viewport_px[0] as i32, viewport_px[1] as i32);
            self.gl.clear_color(clear.r, clear.g, clear.b, clear.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);

            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            self.gl.use_program(Some(self.program));
            if let Some(loc) = &self.u_viewport {
                self.gl.uniform_2_f32(Some(loc), viewport_px[0], viewport_px[1]);
            }
            if let Some(loc) = &self.u_effect_mode {
                self.gl.uniform_1_i32(Some(loc), Effect::Solid as i32);
            }
            if let Some(loc) = &self.u_color {
                self.gl.uniform_4_f32(Some(loc), 1.0, 1.0, 1.0, 1.0);
            }
        }
    }

    pub fn set_time(&mut self, time: f32) {
        unsafe {
            if let Some(loc) = &self.u_time {
                self.gl.uniform_1_f32(Some(loc), time);
            }
        }
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.quad(
            [
                Vec2::new(x, y),
                Vec2::new(x + w, y),
                Vec2::new(x + w, y + h),
                Vec2::new(x, y + h),
            ],
            color,
        );
    }

    /// Fills a convex quad given in winding order.
    pub fn quad(&mut self, corners: [Vec2; 4], color: Color) {
        self.set_state(color, Effect::Solid);
        self.push_quad(corners);
    }

    pub fn glow(&mut self, center: Vec2, radius: f32, color: Color) {
        self.set_state(color, Effect::Glow);
        self.push_quad([
            Vec2::new(center.x - radius, center.y - radius),
            Vec2::new(center.x + radius, center.y - radius),
            Vec2::new(center.x + radius, center.y + radius),
            Vec2::new(center.x - radius, center.y + radius),
        ]);
    }

    /// Full-viewport gradient fading down from `color`.
    pub fn sky(&mut self, color: Color) {
        let [w, h] = self.viewport;
        self.set_state(color, Effect::Sky);
        self.push_quad([
            Vec2::new(0.0, 0.0),
            Vec2::new(w, 0.0),
            Vec2::new(w, h),
            Vec2::new(0.0, h),
        ]);
    }

    /// Draws `text` with the bitmap font; returns the advance width.
    pub fn text(&mut self, text: &str, x: f32, y: f32, pixel: f32, color: Color) -> f32 {
        let mut pen = x;
        for ch in text.chars() {
            if let Some(rows) = font::glyph(ch) {
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..font::GLYPH_WIDTH {
                        if bits & (1 << (font::GLYPH_WIDTH - 1 - col)) != 0 {
                            self.rect(
                                pen + col as f32 * pixel,
                                y + row as f32 * pixel,
                                pixel,
                                pixel,
                                color,
                            );
                        }
                    }
                }
            }
            pen += font::ADVANCE as f32 * pixel;
        }
        pen - x
    }

    fn set_state(&mut self, color: Color, effect: Effect) {
        if color == self.color && effect == self.effect {
            return;
        }
        self.flush_batch();
        self.color = color;
        self.effect = effect;
        unsafe {
            if let Some(loc) = &self.u_color {
                self.gl.uniform_4_f32(Some(loc), color.r, color.g, color.b, color.a);
            }
            if let Some(loc) = &self.u_effect_mode {
                self.gl.uniform_1_i32(Some(loc), effect as i32);
            }
        }
    }

    fn push_quad(&mut self, c: [Vec2; 4]) {
        let v = |p: Vec2, u: f32, w: f32| Vertex { pos: [p.x, p.y], uv: [u, w] };
        self.vertices.extend_from_slice(&[
            v(c[0], 0.0, 0.0),
            v(c[1], 1.0, 0.0),
            v(c[2], 1.0, 1.0),
            v(c[0], 0.0, 0.0),
            v(c[2], 1.0, 1.0),
            v(c[3], 0.0, 1.0),
        ]);
    }

    fn flush_batch(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));

            let data = bytemuck::cast_slice(&self.vertices);
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::DYNAMIC_DRAW);

            let stride = std::mem::size_of::<Vertex>() as i32;
            if let Some(a_pos) = self.a_pos {
                self.gl.enable_vertex_attrib_array(a_pos);
                self.gl.vertex_attrib_pointer_f32(a_pos, 2, glow::FLOAT, false, stride, 0);
            }
            if let Some(a_uv) = self.a_uv {
                self.gl.enable_vertex_attrib_array(a_uv);
                self.gl.vertex_attrib_pointer_f32(a_uv, 2, glow::FLOAT, false, stride, 8);
            }

            self.gl.draw_arrays(glow::TRIANGLES, 0, self.vertices.len() as i32);
        }

        self.vertices.clear();
    }

    pub fn flush(&mut self) {
        self.flush_batch();
    }
}

impl Drop for DrawContext {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_program(self.program);
        }
    }
}
