pub mod candle;
pub mod fireworks;
pub mod intro;

use crate::config::Palette;
use crate::gfx::{camera::OrbitCamera, draw::DrawContext, math::Rect};

/// Per-frame inputs shared by every feature's renderer.
pub struct View<'a> {
    pub camera: &'a OrbitCamera,
    pub viewport: Rect,
    pub time: f32,
    pub backdrop_opacity: f32,
    pub palette: &'a Palette,
}

pub trait Feature {
    fn name(&self) -> &'static str;
    fn update(&mut self, dt: f32, now: f32);
    fn render(&self, draw: &mut DrawContext, view: &View);
}
