use super::{Feature, View};
use crate::gfx::draw::DrawContext;
use crate::gfx::math::Color;
use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

const PARTICLES_PER_BURST: usize = 48;
const LIFETIME: f32 = 1.6;
const GRAVITY: f32 = 3.0;
const DRAG: f32 = 0.6;
const SPEED_RANGE: (f32, f32) = (2.5, 4.5);
const BURST_INTERVAL: (f32, f32) = (0.45, 0.9);
/// Bursts explode below the launch origin, spread over this box.
const BURST_SPREAD_XZ: f32 = 2.5;
const BURST_DROP: (f32, f32) = (6.0, 8.0);
/// World-space spark radius before perspective.
const SPARK_SIZE: f32 = 0.06;

#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub age: f32,
    pub color: Color,
}

impl Particle {
    pub fn alpha(&self) -> f32 {
        (1.0 - self.age / LIFETIME).clamp(0.0, 1.0)
    }
}

pub struct Fireworks {
    active: bool,
    origin: Vec3,
    particles: Vec<Particle>,
    next_burst: Option<f32>,
    rng: StdRng,
}

impl Fireworks {
    pub fn new(origin: Vec3) -> Self {
        Self::with_rng(origin, StdRng::from_entropy())
    }

    pub fn seeded(origin: Vec3, seed: u64) -> Self {
        Self::with_rng(origin, StdRng::seed_from_u64(seed))
    }

    fn with_rng(origin: Vec3, rng: StdRng) -> Self {
        Self {
            active: false,
            origin,
            particles: Vec::new(),
            next_burst: None,
            rng,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starting launches new bursts; stopping lets the live sparks burn out.
    pub fn set_active(&mut self, active: bool) {
        if active != self.active {
            info!("Fireworks {}", if active { "started" } else { "stopped" });
        }
        self.active = active;
        if !active {
            self.next_burst = None;
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn burst(&mut self) {
        let centre = self.origin
            + Vec3::new(
                self.rng.gen_range(-BURST_SPREAD_XZ..BURST_SPREAD_XZ),
                -self.rng.gen_range(BURST_DROP.0..BURST_DROP.1),
                self.rng.gen_range(-BURST_SPREAD_XZ..BURST_SPREAD_XZ),
            );
        let color = Color::from_hue(self.rng.gen::<f32>(), 1.0);
        debug!("Firework burst at {:?}", centre);

        for _ in 0..PARTICLES_PER_BURST {
            // Uniform direction on the sphere.
            let z: f32 = self.rng.gen_range(-1.0..1.0);
            let theta: f32 = self.rng.gen_range(0.0..TAU);
            let r = (1.0 - z * z).sqrt();
            let dir = Vec3::new(r * theta.cos(), z, r * theta.sin());
            let speed = self.rng.gen_range(SPEED_RANGE.0..SPEED_RANGE.1);
            self.particles.push(Particle {
                pos: centre,
                vel: dir * speed,
                age: 0.0,
                color,
            });
        }
    }
}

impl Feature for Fireworks {
    fn name(&self) -> &'static str {
        "fireworks"
    }

    fn update(&mut self, dt: f32, now: f32) {
        if self.active {
            let due = *self.next_burst.get_or_insert(now);
            if now >= due {
                self.burst();
                self.next_burst = Some(now + self.rng.gen_range(BURST_INTERVAL.0..BURST_INTERVAL.1));
            }
        }

        let drag = (1.0 - DRAG * dt).max(0.0);
        for p in &mut self.particles {
            p.vel *= drag;
            p.vel.y -= GRAVITY * dt;
            p.pos += p.vel * dt;
            p.age += dt;
        }
        self.particles.retain(|p| p.age < LIFETIME);
    }

    fn render(&self, draw: &mut DrawContext, view: &View) {
        let focal = view.viewport.height * 0.5;
        for p in &self.particles {
            if let Some(px) = view.camera.project(p.pos) {
                let radius = (SPARK_SIZE * focal / px.depth).max(1.5);
                draw.glow(px.pos, radius * 2.5, p.color.with_alpha(p.alpha()));
            }
        }
    }
}
