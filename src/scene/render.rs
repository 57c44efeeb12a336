//! Painter's-algorithm renderer for the procedural scene.
//!
//! Geometry is built in world space every frame, projected through the orbit
//! camera, shaded with a single sun plus ambient/environment terms, then
//! sorted back to front.

use super::focus::CardDeck;
use super::timeline::TimelineFrame;
use crate::features::candle::Candle;
use crate::gfx::camera::OrbitCamera;
use crate::gfx::draw::DrawContext;
use crate::gfx::font;
use crate::gfx::math::{Color, Rect};
use glam::{Quat, Vec2, Vec3};
use std::f32::consts::TAU;

const TABLE_TOP_Y: f32 = 0.70;
const TABLE_HALF: Vec3 = Vec3::new(2.0, 0.04, 3.6);
const LEG_HALF: Vec3 = Vec3::new(0.06, 0.33, 0.06);

const CAKE_BASE_Y: f32 = 0.74;
const CAKE_SIDES: usize = 16;
/// (radius, height) of each tier, bottom first.
const CAKE_TIERS: [(f32, f32); 2] = [(0.55, 0.22), (0.38, 0.14)];

const CANDLE_BASE_Y: f32 = 1.1;
const CANDLE_HALF: Vec3 = Vec3::new(0.025, 0.12, 0.025);
const FLAME_RADIUS: f32 = 0.06;

/// (position, rotation about Y, scale) of the picture frames on the table.
const FRAMES: [([f32; 3], f32, f32); 4] = [
    ([0.0, 0.735, 3.0], 5.6, 0.75),
    ([0.0, 0.735, -3.0], 4.0, 0.75),
    ([-1.5, 0.735, 2.5], 5.4, 0.75),
    ([-1.5, 0.735, -2.5], 4.2, 0.75),
];
const FRAME_SIZE: (f32, f32) = (0.4, 0.5);

const SUN: Vec3 = Vec3::new(2.0, 10.0, 0.0);
const SUN_INTENSITY: f32 = 2.0;
const SKY_COLOR: Color = Color { r: 1.0, g: 0.78, b: 0.55, a: 1.0 };

pub const HINT_TEXT: &str = "press space to blow out the candle";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Quad([Vec2; 4]),
    Glow { center: Vec2, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub depth: f32,
    pub color: Color,
}

/// Everything the renderer reads for one frame.
pub struct SceneInputs<'a> {
    pub frame: &'a TimelineFrame,
    pub cards: &'a CardDeck,
    pub candle: &'a Candle,
    pub camera: &'a OrbitCamera,
    pub time: f32,
}

#[derive(Debug, Clone, Copy)]
struct Lighting {
    ambient: f32,
    environment: f32,
    sun: Vec3,
}

impl Lighting {
    fn new(environment_progress: f32) -> Self {
        Self {
            ambient: (1.0 - environment_progress) * 2.5,
            environment: 1.5 * environment_progress,
            sun: SUN.normalize(),
        }
    }

    fn shade(&self, base: Color, normal: Vec3) -> Color {
        let diffuse = normal.dot(self.sun).max(0.0) * SUN_INTENSITY;
        let k = 0.15 + 0.12 * self.ambient + 0.22 * diffuse + 0.2 * self.environment;
        base.scaled(k)
    }
}

#[derive(Default)]
pub struct SceneRenderer {
    primitives: Vec<Primitive>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives from the last [`build`](Self::build), far to near.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn build(&mut self, inputs: &SceneInputs) {
        self.primitives.clear();
        let cam = inputs.camera;
        let light = Lighting::new(inputs.frame.environment_progress);
        let pose = inputs.frame.pose;
        let table = Vec3::new(0.0, 0.0, pose.table_z);

        // Table and legs.
        let wood = Color::rgba(139, 90, 43, 255);
        let top = table + Vec3::new(0.0, TABLE_TOP_Y - TABLE_HALF.y, 0.0);
        self.push_box(cam, &light, top, TABLE_HALF, Quat::IDENTITY, wood);
        for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let leg = Vec3::new(
                sx * (TABLE_HALF.x - 0.2),
                LEG_HALF.y - 0.02,
                sz * (TABLE_HALF.z - 0.3),
            );
            self.push_box(cam, &light, table + leg, LEG_HALF, Quat::IDENTITY, wood.scaled(0.8));
        }

        // Picture frames stand on the table and ride with it.
        for (i, (pos, rot_y, scale)) in FRAMES.iter().enumerate() {
            let rot = Quat::from_rotation_y(*rot_y);
            let half = Vec3::new(FRAME_SIZE.0 * 0.5 * scale, FRAME_SIZE.1 * 0.5 * scale, 0.015);
            let centre = table + Vec3::from_array(*pos) + Vec3::new(0.0, half.y, 0.0);
            self.push_box(cam, &light, centre, half, rot, Color::rgba(40, 30, 25, 255));
            let photo = Color::from_hue(0.08 + i as f32 * 0.21, 0.75);
            let inset = Vec3::new(half.x * 0.8, half.y * 0.8, 0.0);
            let front = centre + rot * Vec3::new(0.0, 0.0, half.z + 0.002);
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .map(|(x, y)| front + rot * Vec3::new(x * inset.x, y * inset.y, 0.0));
            self.push_face(cam, &light, corners, Some(rot * Vec3::Z), photo);
        }

        // Cards, double sided.
        for card in inputs.cards.cards() {
            let corners = card.corners(table);
            let border = Color::rgba(250, 244, 230, 255);
            let face = if card.is_hovered() {
                Color::rgba(255, 214, 150, 255)
            } else {
                Color::rgba(236, 120, 140, 255)
            };
            self.push_face(cam, &light, corners, None, border);
            let centre = corners.iter().fold(Vec3::ZERO, |acc, c| acc + *c) * 0.25;
            let normal = card.pose().rotation * Vec3::Z;
            let inner = corners.map(|c| centre.lerp(c, 0.85) + normal * 0.002);
            self.push_face(cam, &light, inner, None, face);
        }

        // Cake tiers, spinning as they descend.
        let mut y = CAKE_BASE_Y + pose.cake_y;
        for (i, (radius, height)) in CAKE_TIERS.iter().enumerate() {
            let sponge = if i == 0 {
                Color::rgba(244, 194, 194, 255)
            } else {
                Color::rgba(250, 218, 221, 255)
            };
            self.push_prism(cam, &light, y, *radius, *height, pose.cake_spin, sponge);
            y += height;
        }

        // Candle and flame.
        if pose.candle_visible {
            let base = Vec3::new(0.0, CANDLE_BASE_Y + pose.candle_y, 0.0);
            self.push_box(
                cam,
                &light,
                base + Vec3::new(0.0, CANDLE_HALF.y, 0.0),
                CANDLE_HALF,
                Quat::IDENTITY,
                Color::rgba(120, 170, 235, 255),
            );
            let strength = inputs.candle.flame_strength(inputs.time);
            if strength > 0.0 {
                let tip = base + Vec3::new(0.0, CANDLE_HALF.y * 2.0 + FLAME_RADIUS, 0.0);
                if let Some(px) = cam.project(tip) {
                    let focal = cam.viewport()[1] * 0.5;
                    self.primitives.push(Primitive {
                        shape: Shape::Glow {
                            center: px.pos,
                            radius: FLAME_RADIUS * strength * focal / px.depth * 2.0,
                        },
                        depth: px.depth - 0.01,
                        color: Color::rgba(255, 190, 90, 255).with_alpha(strength),
                    });
                }
            }
        }

        self.primitives.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    }

    pub fn draw(&self, draw: &mut DrawContext, environment_progress: f32) {
        if environment_progress > 0.0 {
            draw.sky(SKY_COLOR.with_alpha(environment_progress * 0.85));
        }
        for p in &self.primitives {
            match p.shape {
                Shape::Quad(corners) => draw.quad(corners, p.color),
                Shape::Glow { center, radius } => draw.glow(center, radius, p.color),
            }
        }
    }

    fn push_face(
        &mut self,
        cam: &OrbitCamera,
        light: &Lighting,
        world: [Vec3; 4],
        normal: Option<Vec3>,
        base: Color,
    ) {
        let centroid = world.iter().fold(Vec3::ZERO, |acc, c| acc + *c) * 0.25;
        let to_camera = cam.position() - centroid;
        let normal = match normal {
            Some(n) => {
                if n.dot(to_camera) <= 0.0 {
                    return;
                }
                n
            }
            None => {
                let n = (world[1] - world[0]).cross(world[3] - world[0]).normalize_or_zero();
                if n.dot(to_camera) < 0.0 {
                    -n
                } else {
                    n
                }
            }
        };

        let mut corners = [Vec2::default(); 4];
        let mut depth = 0.0;
        for (slot, p) in corners.iter_mut().zip(world) {
            let Some(px) = cam.project(p) else {
                return;
            };
            *slot = px.pos;
            depth += px.depth * 0.25;
        }

        self.primitives.push(Primitive {
            shape: Shape::Quad(corners),
            depth,
            color: light.shade(base, normal),
        });
    }

    fn push_box(
        &mut self,
        cam: &OrbitCamera,
        light: &Lighting,
        centre: Vec3,
        half: Vec3,
        rot: Quat,
        base: Color,
    ) {
        let corner = |x: f32, y: f32, z: f32| centre + rot * (Vec3::new(x, y, z) * half);
        // (normal, four corners counter-clockwise seen from outside)
        let faces = [
            (Vec3::new(1.0, 0.0, 0.0), [(1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (1.0, 1.0, 1.0), (1.0, -1.0, 1.0)]),
            (Vec3::new(-1.0, 0.0, 0.0), [(-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0), (-1.0, -1.0, -1.0)]),
            (Vec3::new(0.0, 1.0, 0.0), [(-1.0, 1.0, -1.0), (-1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, -1.0)]),
            (Vec3::new(0.0, -1.0, 0.0), [(-1.0, -1.0, 1.0), (-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, -1.0, 1.0)]),
            (Vec3::new(0.0, 0.0, 1.0), [(-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)]),
            (Vec3::new(0.0, 0.0, -1.0), [(1.0, -1.0, -1.0), (-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (1.0, 1.0, -1.0)]),
        ];
        for (normal, quad) in faces {
            let world = quad.map(|(x, y, z)| corner(x, y, z));
            self.push_face(cam, light, world, Some(rot * normal), base);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_prism(
        &mut self,
        cam: &OrbitCamera,
        light: &Lighting,
        base_y: f32,
        radius: f32,
        height: f32,
        spin: f32,
        base: Color,
    ) {
        let top_y = base_y + height;
        let rim = |i: usize, y: f32| {
            let a = spin + i as f32 * TAU / CAKE_SIDES as f32;
            Vec3::new(radius * a.cos(), y, radius * a.sin())
        };

        for i in 0..CAKE_SIDES {
            let j = (i + 1) % CAKE_SIDES;
            let mid = spin + (i as f32 + 0.5) * TAU / CAKE_SIDES as f32;
            let normal = Vec3::new(mid.cos(), 0.0, mid.sin());
            // Alternate shades so the spin reads.
            let tint = if i % 2 == 0 { base } else { base.scaled(0.93) };
            self.push_face(
                cam,
                light,
                [rim(i, base_y), rim(i, top_y), rim(j, top_y), rim(j, base_y)],
                Some(normal),
                tint,
            );
        }

        // Icing on top as a fan of triangles.
        let icing = Color::rgba(255, 250, 245, 255);
        let centre = Vec3::new(0.0, top_y, 0.0);
        for i in 0..CAKE_SIDES {
            let j = (i + 1) % CAKE_SIDES;
            let (a, b) = (rim(i, top_y), rim(j, top_y));
            self.push_face(cam, light, [centre, b, a, a], Some(Vec3::Y), icing);
        }
    }
}

/// Centred prompt near the bottom of the viewport.
pub fn draw_hint(draw: &mut DrawContext, viewport: Rect, color: Color, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let pixel = (viewport.height / 300.0).floor().max(2.0);
    let width = font::text_width(HINT_TEXT, pixel);
    let x = viewport.x + (viewport.width - width) * 0.5;
    let y = viewport.y + viewport.height * 0.88;
    draw.text(HINT_TEXT, x, y, pixel, color.with_alpha(alpha));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::focus::CardDescriptor;
    use crate::scene::timeline::{ScenePose, TimelineFrame, TOTAL_DURATION};
    use std::f32::consts::{FRAC_PI_2, PI};

    fn frame_at(elapsed: f32) -> TimelineFrame {
        TimelineFrame {
            pose: ScenePose::sample(elapsed),
            elapsed,
            background_opacity: 1.0,
            environment_progress: 0.0,
            completed: elapsed >= TOTAL_DURATION,
        }
    }

    fn deck() -> CardDeck {
        CardDeck::new([CardDescriptor {
            id: "a".into(),
            image: String::new(),
            position: [1.0, 0.745, -2.0],
            rotation: [-FRAC_PI_2, 0.0, PI / 3.0],
        }])
    }

    fn build(elapsed: f32, candle: &Candle) -> Vec<Primitive> {
        let frame = frame_at(elapsed);
        let cards = deck();
        let camera = OrbitCamera::new();
        let mut renderer = SceneRenderer::new();
        renderer.build(&SceneInputs {
            frame: &frame,
            cards: &cards,
            candle,
            camera: &camera,
            time: 1.0,
        });
        renderer.primitives().to_vec()
    }

    fn glows(prims: &[Primitive]) -> usize {
        prims.iter().filter(|p| matches!(p.shape, Shape::Glow { .. })).count()
    }

    #[test]
    fn primitives_are_sorted_far_to_near() {
        let prims = build(TOTAL_DURATION, &Candle::new());
        assert!(!prims.is_empty());
        for pair in prims.windows(2) {
            assert!(pair[0].depth >= pair[1].depth);
        }
    }

    #[test]
    fn candle_flame_only_once_visible_and_lit() {
        assert_eq!(glows(&build(1.0, &Candle::new())), 0);
        assert_eq!(glows(&build(TOTAL_DURATION, &Candle::new())), 1);

        let mut out = Candle::new();
        out.blow_out(0.0);
        out.update(10.0);
        assert_eq!(glows(&build(TOTAL_DURATION, &out)), 0);
    }

    #[test]
    fn settled_scene_has_more_geometry_in_view_than_the_start() {
        // At the start the cake is overhead and the table far behind the camera.
        let start = build(0.0, &Candle::new());
        let end = build(TOTAL_DURATION, &Candle::new());
        assert!(end.len() > start.len());
    }

    #[test]
    fn faces_towards_the_sun_are_brighter() {
        let grey = Color::rgba(160, 160, 160, 255);
        for env in [0.0, 0.5, 1.0] {
            let light = Lighting::new(env);
            let top = light.shade(grey, Vec3::Y);
            let side = light.shade(grey, Vec3::Z);
            assert!(top.r > side.r);
            assert!(side.r > 0.0);
            assert_eq!(top.a, 1.0);
        }
    }
}
