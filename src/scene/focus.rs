//! Cards that rest on the table and can be brought up in front of the camera.
//!
//! Card poses are kept in table-local space so a resting card rides along
//! with the table while it slides in. Only one card is focused at a time.

use crate::gfx::anim::damp;
use glam::{EulerRot, Quat, Vec3};
use log::info;
use serde::{Deserialize, Serialize};

const CARD_SCALE: f32 = 0.25;
pub const CARD_WIDTH: f32 = 4.0 * CARD_SCALE;
pub const CARD_HEIGHT: f32 = 3.0 * CARD_SCALE;
const CAMERA_DISTANCE: f32 = 1.2;
const CAMERA_Y_FLOOR: f32 = 0.8;
const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, -0.05, 0.0);
const HOVER_LIFT: f32 = 0.04;
/// Exponential approach rate towards the target pose, per second.
const SMOOTHING_RATE: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDescriptor {
    pub id: String,
    /// Face image reference, handed through to the host untouched.
    #[serde(default)]
    pub image: String,
    pub position: [f32; 3],
    /// Euler angles in radians, `XYZ` order.
    pub rotation: [f32; 3],
}

/// Which card, if any, is attached to the camera.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    Active(String),
}

impl Focus {
    pub fn is_active(&self, id: &str) -> bool {
        matches!(self, Focus::Active(active) if active == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        match self {
            Focus::None => None,
            Focus::Active(id) => Some(id),
        }
    }

    /// Clicking the focused card puts it back; clicking any other card
    /// focuses that one instead.
    pub fn toggled(&self, id: &str) -> Focus {
        if self.is_active(id) {
            Focus::None
        } else {
            Focus::Active(id.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// The parts of the camera a focused card tracks.
#[derive(Debug, Clone, Copy)]
pub struct CameraView {
    pub position: Vec3,
    pub forward: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone)]
pub struct FocusCard {
    descriptor: CardDescriptor,
    resting: Pose,
    current: Pose,
    hovered: bool,
}

impl FocusCard {
    pub fn new(descriptor: CardDescriptor) -> Self {
        let resting = Pose {
            position: Vec3::from_array(descriptor.position),
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                descriptor.rotation[0],
                descriptor.rotation[1],
                descriptor.rotation[2],
            ),
        };
        Self {
            descriptor,
            resting,
            current: resting,
            hovered: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn image(&self) -> &str {
        &self.descriptor.image
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Current pose in table-local space.
    pub fn pose(&self) -> Pose {
        self.current
    }

    pub fn resting_pose(&self) -> Pose {
        self.resting
    }

    pub fn target_pose(&self, active: bool, camera: &CameraView, table_offset: Vec3) -> Pose {
        if active {
            let mut world = camera.position + camera.forward * CAMERA_DISTANCE + CAMERA_OFFSET;
            if world.y < CAMERA_Y_FLOOR {
                world.y = CAMERA_Y_FLOOR;
            }
            Pose {
                position: world - table_offset,
                rotation: camera.rotation,
            }
        } else {
            let mut position = self.resting.position;
            if self.hovered {
                position.y += HOVER_LIFT;
            }
            Pose {
                position,
                rotation: self.resting.rotation,
            }
        }
    }

    pub fn update(&mut self, dt: f32, active: bool, camera: &CameraView, table_offset: Vec3) {
        let target = self.target_pose(active, camera, table_offset);
        let t = damp(SMOOTHING_RATE, dt.max(0.0));
        self.current = Pose {
            position: self.current.position.lerp(target.position, t),
            rotation: self.current.rotation.slerp(target.rotation, t),
        };
    }

    /// World-space corners, counter-clockwise seen from the face.
    pub fn corners(&self, table_offset: Vec3) -> [Vec3; 4] {
        let (hw, hh) = (CARD_WIDTH * 0.5, CARD_HEIGHT * 0.5);
        let origin = self.current.position + table_offset;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .map(|(x, y)| origin + self.current.rotation * Vec3::new(x, y, 0.0))
    }

    /// Distance along the ray to the card face, if it is hit.
    pub fn intersect(&self, origin: Vec3, dir: Vec3, table_offset: Vec3) -> Option<f32> {
        let rot = self.current.rotation;
        let normal = rot * Vec3::Z;
        let denom = normal.dot(dir);
        if denom.abs() < 1e-6 {
            return None;
        }
        let centre = self.current.position + table_offset;
        let t = normal.dot(centre - origin) / denom;
        if t <= 0.0 {
            return None;
        }
        let local = (origin + dir * t) - centre;
        let x = local.dot(rot * Vec3::X);
        let y = local.dot(rot * Vec3::Y);
        (x.abs() <= CARD_WIDTH * 0.5 && y.abs() <= CARD_HEIGHT * 0.5).then_some(t)
    }
}

/// All focusable cards plus the shared focus selection.
#[derive(Debug, Clone, Default)]
pub struct CardDeck {
    cards: Vec<FocusCard>,
    focus: Focus,
}

impl CardDeck {
    pub fn new(descriptors: impl IntoIterator<Item = CardDescriptor>) -> Self {
        Self {
            cards: descriptors.into_iter().map(FocusCard::new).collect(),
            focus: Focus::None,
        }
    }

    pub fn cards(&self) -> &[FocusCard] {
        &self.cards
    }

    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        if focus == self.focus {
            return;
        }
        match focus.active_id() {
            Some(id) => {
                let image = self.cards.iter().find(|c| c.id() == id).map_or("", |c| c.image());
                info!("Card '{}' focused (image '{}')", id, image);
            }
            None => info!("Card focus cleared"),
        }
        for card in &mut self.cards {
            if !focus.is_active(card.id()) {
                card.hovered = false;
            }
        }
        self.focus = focus;
    }

    /// Toggles `id` and returns the new focus for the caller to observe.
    pub fn toggle(&mut self, id: &str) -> &Focus {
        let next = self.focus.toggled(id);
        self.set_focus(next);
        &self.focus
    }

    /// Marks the card under the pointer; `None` clears hover everywhere.
    pub fn set_hovered(&mut self, id: Option<&str>) {
        for card in &mut self.cards {
            card.hovered = id == Some(card.id());
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.cards.iter().find(|c| c.hovered).map(|c| c.id())
    }

    /// Nearest card hit by the ray.
    pub fn pick(&self, origin: Vec3, dir: Vec3, table_offset: Vec3) -> Option<&str> {
        self.cards
            .iter()
            .filter_map(|c| c.intersect(origin, dir, table_offset).map(|t| (t, c.id())))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    pub fn update(&mut self, dt: f32, camera: &CameraView, table_offset: Vec3) {
        for card in &mut self.cards {
            let active = self.focus.is_active(card.id());
            card.update(dt, active, camera, table_offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn descriptor(id: &str, x: f32) -> CardDescriptor {
        CardDescriptor {
            id: id.to_string(),
            image: format!("{id}.png"),
            position: [x, 0.745, -2.0],
            rotation: [-FRAC_PI_2, 0.0, PI / 3.0],
        }
    }

    fn camera_at(position: Vec3) -> CameraView {
        let forward = (Vec3::new(0.0, 1.0, 0.0) - position).normalize();
        CameraView {
            position,
            forward,
            rotation: Quat::from_rotation_y(FRAC_PI_2),
        }
    }

    fn settle(deck: &mut CardDeck, camera: &CameraView, offset: Vec3) {
        for _ in 0..600 {
            deck.update(1.0 / 60.0, camera, offset);
        }
    }

    #[test]
    fn toggle_semantics() {
        let focus = Focus::None;
        let a = focus.toggled("a");
        assert_eq!(a, Focus::Active("a".into()));
        assert_eq!(a.toggled("a"), Focus::None);
        assert_eq!(a.toggled("b"), Focus::Active("b".into()));
        assert!(a.is_active("a"));
        assert!(!a.is_active("b"));
    }

    #[test]
    fn focusing_clears_hover_on_other_cards() {
        let mut deck = CardDeck::new([descriptor("a", 1.0), descriptor("b", -1.0)]);
        deck.set_hovered(Some("b"));
        assert_eq!(deck.hovered(), Some("b"));
        deck.toggle("a");
        assert_eq!(deck.hovered(), None);
        assert_eq!(deck.focus().active_id(), Some("a"));
    }

    #[test]
    fn resting_card_lifts_when_hovered() {
        let mut deck = CardDeck::new([descriptor("a", 1.0)]);
        let camera = camera_at(Vec3::new(3.0, 2.0, 0.0));
        deck.set_hovered(Some("a"));
        settle(&mut deck, &camera, Vec3::ZERO);
        let card = &deck.cards()[0];
        assert!((card.pose().position.y - (0.745 + HOVER_LIFT)).abs() < 1e-3);

        deck.set_hovered(None);
        settle(&mut deck, &camera, Vec3::ZERO);
        let card = &deck.cards()[0];
        assert!((card.pose().position - card.resting_pose().position).length() < 1e-3);
    }

    #[test]
    fn active_card_attaches_in_front_of_camera() {
        let mut deck = CardDeck::new([descriptor("a", 1.0)]);
        let camera = camera_at(Vec3::new(3.0, 2.0, 0.0));
        deck.toggle("a");
        settle(&mut deck, &camera, Vec3::ZERO);

        let pose = deck.cards()[0].pose();
        let expected = camera.position + camera.forward * CAMERA_DISTANCE + CAMERA_OFFSET;
        assert!((pose.position - expected).length() < 1e-3);
        assert!(pose.rotation.angle_between(camera.rotation) < 1e-2);

        // Hover never lifts an attached card.
        deck.set_hovered(Some("a"));
        let target = deck.cards()[0].target_pose(true, &camera, Vec3::ZERO);
        assert!((target.position - expected).length() < 1e-5);

        deck.toggle("a");
        settle(&mut deck, &camera, Vec3::ZERO);
        let card = &deck.cards()[0];
        assert!((card.pose().position - card.resting_pose().position).length() < 1e-3);
    }

    #[test]
    fn focus_transition_is_smoothed_per_frame() {
        let mut deck = CardDeck::new([descriptor("a", 1.0)]);
        let camera = camera_at(Vec3::new(3.0, 2.0, 0.0));
        deck.toggle("a");

        let rest = deck.cards()[0].resting_pose();
        let target = deck.cards()[0].target_pose(true, &camera, Vec3::ZERO);
        let span = (target.position - rest.position).length();
        assert!(span > 0.5);

        deck.update(1.0 / 60.0, &camera, Vec3::ZERO);
        let first = deck.cards()[0].pose();
        let moved = (first.position - rest.position).length();
        let left = (target.position - first.position).length();
        assert!(moved > 1e-3, "card did not move");
        assert!(left > 1e-3, "card jumped straight to the camera");
        assert!((moved + left - span).abs() < 1e-4, "card left the straight path");
        let turn_left = first.rotation.angle_between(target.rotation);
        assert!(turn_left > 1e-3);

        deck.update(1.0 / 60.0, &camera, Vec3::ZERO);
        let second = deck.cards()[0].pose();
        assert!((target.position - second.position).length() < left);
        assert!(second.rotation.angle_between(target.rotation) < turn_left);
    }

    #[test]
    fn attached_pose_respects_height_floor() {
        let card = FocusCard::new(descriptor("a", 1.0));
        let low = CameraView {
            position: Vec3::new(2.0, 0.3, 0.0),
            forward: Vec3::new(-1.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
        };
        let target = card.target_pose(true, &low, Vec3::ZERO);
        assert_eq!(target.position.y, CAMERA_Y_FLOOR);
    }

    #[test]
    fn attached_target_is_world_space_under_table_offset() {
        let card = FocusCard::new(descriptor("a", 1.0));
        let camera = camera_at(Vec3::new(3.0, 2.0, 0.0));
        let offset = Vec3::new(0.0, 0.0, 12.0);
        let world = card.target_pose(true, &camera, offset).position + offset;
        let expected = camera.position + camera.forward * CAMERA_DISTANCE + CAMERA_OFFSET;
        assert!((world - expected).length() < 1e-4);
    }

    #[test]
    fn resting_card_rides_with_the_table() {
        let card = FocusCard::new(descriptor("a", 1.0));
        let at_rest = card.corners(Vec3::ZERO);
        let slid = card.corners(Vec3::new(0.0, 0.0, 5.0));
        for (a, b) in at_rest.iter().zip(&slid) {
            assert!((b.z - a.z - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn picking_finds_card_under_ray() {
        let deck = CardDeck::new([descriptor("a", 1.0), descriptor("b", -1.0)]);
        let origin = Vec3::new(1.0, 5.0, -2.0);
        let down = Vec3::new(0.0, -1.0, 0.0);
        assert_eq!(deck.pick(origin, down, Vec3::ZERO), Some("a"));
        assert_eq!(deck.pick(Vec3::new(-1.0, 5.0, -2.0), down, Vec3::ZERO), Some("b"));
        assert_eq!(deck.pick(Vec3::new(0.0, 5.0, 2.0), down, Vec3::ZERO), None);
        // Pointing away from the card.
        assert_eq!(deck.pick(origin, -down, Vec3::ZERO), None);
    }
}
