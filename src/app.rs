use crate::audio::BackgroundMusic;
use crate::config::{Config, Palette};
use crate::features::candle::Candle;
use crate::features::fireworks::Fireworks;
use crate::features::intro::Intro;
use crate::features::{Feature, View};
use crate::gfx::anim::Timeline;
use crate::gfx::camera::OrbitCamera;
use crate::gfx::draw::DrawContext;
use crate::gfx::math::Rect;
use glam::{Vec2, Vec3};
use crate::scene::focus::{CameraView, CardDeck, Focus};
use crate::scene::render::{self, SceneInputs, SceneRenderer};
use crate::scene::timeline::{TimelineDriver, TimelineFrame, TimelineListener};
use anyhow::Result;
use log::{debug, info, warn};

/// xkb keysyms the app reacts to.
pub const KEY_SPACE: u32 = 0x0020;
pub const KEY_ESCAPE: u32 = 0xff1b;

/// Linux input event codes.
pub const BTN_LEFT: u32 = 0x110;

const FIREWORKS_ORIGIN: Vec3 = Vec3::new(0.0, 10.0, 0.0);
const HINT_FADE: f32 = 0.8;

#[derive(Debug, Clone)]
pub enum UiEvent {
    PointerEnter { pos: Vec2 },
    PointerLeave,
    PointerMove { pos: Vec2 },
    PointerDown { pos: Vec2, button: u32 },
    PointerUp { button: u32 },
    Scroll { delta: f32 },
    Key(u32),
}

/// Host-side copy of what the timeline driver reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossfade {
    pub backdrop_opacity: f32,
    pub environment_progress: f32,
    pub sequence_complete: bool,
}

impl Default for Crossfade {
    fn default() -> Self {
        Self {
            backdrop_opacity: 1.0,
            environment_progress: 0.0,
            sequence_complete: false,
        }
    }
}

impl TimelineListener for Crossfade {
    fn background_opacity_changed(&mut self, opacity: f32) {
        self.backdrop_opacity = opacity;
    }

    fn environment_progress_changed(&mut self, progress: f32) {
        self.environment_progress = progress;
    }

    fn sequence_completed(&mut self) {
        self.sequence_complete = true;
    }
}

pub struct App {
    pub config: Config,
    palette: Palette,
    time: f32,
    running: bool,
    started: bool,

    intro: Intro,
    driver: TimelineDriver,
    frame: TimelineFrame,
    crossfade: Crossfade,
    hint: Timeline,

    candle: Candle,
    fireworks: Fireworks,
    cards: CardDeck,
    camera: OrbitCamera,
    renderer: SceneRenderer,
    music: Option<BackgroundMusic>,

    pointer: Option<Vec2>,
    drag: Option<Vec2>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let intro = Intro::new(config.intro.lines.clone(), config.intro.timings())?;
        let mut driver = TimelineDriver::new();
        let mut crossfade = Crossfade::default();
        let frame = driver.step(0.0, false, &mut crossfade);
        driver.prime(&mut crossfade);

        Ok(Self {
            palette: config.theme.palette(),
            cards: CardDeck::new(config.cards.iter().cloned()),
            config,
            time: 0.0,
            running: true,
            started: false,
            intro,
            driver,
            frame,
            crossfade,
            hint: Timeline::new(HINT_FADE),
            candle: Candle::new(),
            fireworks: Fireworks::new(FIREWORKS_ORIGIN),
            camera: OrbitCamera::new(),
            renderer: SceneRenderer::new(),
            music: None,
            pointer: None,
            drag: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame(&self) -> &TimelineFrame {
        &self.frame
    }

    pub fn crossfade(&self) -> Crossfade {
        self.crossfade
    }

    pub fn intro(&self) -> &Intro {
        &self.intro
    }

    pub fn candle(&self) -> &Candle {
        &self.candle
    }

    pub fn fireworks(&self) -> &Fireworks {
        &self.fireworks
    }

    pub fn cards(&self) -> &CardDeck {
        &self.cards
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn set_viewport(&mut self, size: [u32; 2]) {
        self.camera.set_viewport([size[0] as f32, size[1] as f32]);
    }

    /// True while the pointer is over a card; the host shows a hand cursor.
    pub fn wants_hand_cursor(&self) -> bool {
        self.cards.hovered().is_some()
    }

    pub fn hint_visible(&self) -> bool {
        self.crossfade.sequence_complete && self.candle.is_lit()
    }

    fn table_offset(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.frame.pose.table_z)
    }

    fn camera_view(&self) -> CameraView {
        CameraView {
            position: self.camera.position(),
            forward: self.camera.forward(),
            rotation: self.camera.quaternion(),
        }
    }

    /// First press plays music and starts typing; once the sequence has
    /// finished, the next press blows the candle out.
    pub fn press_space(&mut self) {
        if !self.started {
            self.started = true;
            info!("Starting greeting");
            self.music = BackgroundMusic::try_play(&self.config.music.command);
            if let Err(e) = self.intro.start() {
                warn!("Failed to start intro: {:#}", e);
            }
        } else if self.crossfade.sequence_complete && self.candle.is_lit() {
            self.candle.blow_out(self.time);
            self.fireworks.set_active(true);
        } else {
            debug!("Space ignored while the sequence plays");
        }
    }

    pub fn toggle_card(&mut self, id: &str) -> &Focus {
        self.cards.toggle(id)
    }

    fn card_at(&self, pos: Vec2) -> Option<String> {
        let origin = self.camera.position();
        let dir = self.camera.ray_direction(pos);
        self.cards
            .pick(origin, dir, self.table_offset())
            .map(str::to_string)
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::PointerEnter { pos } => {
                self.pointer = Some(pos);
                self.refresh_hover();
            }
            UiEvent::PointerLeave => {
                self.pointer = None;
                self.drag = None;
                self.cards.set_hovered(None);
            }
            UiEvent::PointerMove { pos } => {
                if let Some(last) = self.drag {
                    self.camera.rotate_by_pixels(pos.x - last.x, pos.y - last.y);
                    self.drag = Some(pos);
                }
                self.pointer = Some(pos);
                self.refresh_hover();
            }
            UiEvent::PointerDown { pos, button } => {
                if button != BTN_LEFT {
                    return;
                }
                match self.card_at(pos) {
                    Some(id) => {
                        self.toggle_card(&id);
                    }
                    None => self.drag = Some(pos),
                }
            }
            UiEvent::PointerUp { button } => {
                if button == BTN_LEFT {
                    self.drag = None;
                }
            }
            UiEvent::Scroll { delta } => {
                if delta == 0.0 || delta.is_nan() {
                    return;
                }
                // Wheel down (positive) moves away.
                self.camera.zoom_by(-delta.signum());
            }
            UiEvent::Key(KEY_SPACE) => self.press_space(),
            UiEvent::Key(KEY_ESCAPE) => {
                info!("Escape pressed, quitting");
                self.running = false;
            }
            UiEvent::Key(key) => debug!("Unhandled key {:#x}", key),
        }
    }

    fn refresh_hover(&mut self) {
        let hovered = match (self.pointer, self.drag) {
            (Some(pos), None) => self.card_at(pos),
            _ => None,
        };
        self.cards.set_hovered(hovered.as_deref());
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        let now = self.time;

        self.intro.update(dt, now);
        let playing = self.started && self.intro.scene_started();
        let was_complete = self.crossfade.sequence_complete;
        self.frame = self.driver.step(now, playing, &mut self.crossfade);
        if self.crossfade.sequence_complete && !was_complete {
            self.intro.cancel();
            self.hint.start(now);
        }
        self.hint.update(now);

        self.camera.update();
        self.candle.update(now);
        self.fireworks.update(dt, now);

        let view = self.camera_view();
        let offset = self.table_offset();
        self.cards.update(dt, &view, offset);

        self.renderer.build(&SceneInputs {
            frame: &self.frame,
            cards: &self.cards,
            candle: &self.candle,
            camera: &self.camera,
            time: now,
        });
    }

    pub fn render(&self, draw: &mut DrawContext) {
        let [w, h] = draw.viewport();
        let viewport = Rect::new(0.0, 0.0, w, h);
        draw.set_time(self.time);

        let view = View {
            camera: &self.camera,
            viewport,
            time: self.time,
            backdrop_opacity: self.crossfade.backdrop_opacity,
            palette: &self.palette,
        };

        self.intro.render(draw, &view);
        self.renderer.draw(draw, self.crossfade.environment_progress);
        self.fireworks.render(draw, &view);
        if self.hint_visible() {
            render::draw_hint(draw, viewport, self.palette.text, self.hint.eased_progress());
        }
        draw.flush();
    }
}
