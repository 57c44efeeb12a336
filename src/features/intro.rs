//! Typed-text intro shown over the backdrop before the scene plays.
//!
//! Reveal, post-typing delay and cursor blink are independent calloop
//! timers; the frame loop dispatches them without blocking.

use super::{Feature, View};
use crate::gfx::draw::DrawContext;
use crate::gfx::font;
use anyhow::{anyhow, Result};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, RegistrationToken};
use log::{debug, info};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntroTimings {
    pub char_delay: Duration,
    pub post_typing_delay: Duration,
    pub cursor_blink: Duration,
}

impl Default for IntroTimings {
    fn default() -> Self {
        Self {
            char_delay: Duration::from_millis(100),
            post_typing_delay: Duration::from_millis(1000),
            cursor_blink: Duration::from_millis(480),
        }
    }
}

/// Character-by-character reveal over a fixed list of lines.
#[derive(Debug, Clone)]
pub struct Typewriter {
    lines: Vec<String>,
    line: usize,
    chars: usize,
}

impl Typewriter {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            line: 0,
            chars: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.line >= self.lines.len()
    }

    /// Reveals one more character, or moves to the next line once the
    /// current one is fully shown.
    pub fn advance(&mut self) {
        let Some(current) = self.lines.get(self.line) else {
            return;
        };
        if self.chars < current.chars().count() {
            self.chars += 1;
        } else {
            self.line += 1;
            self.chars = 0;
        }
    }

    pub fn visible_lines(&self) -> Vec<&str> {
        let complete = self.is_complete();
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                if complete || i < self.line {
                    line.as_str()
                } else if i == self.line {
                    let end = line
                        .char_indices()
                        .nth(self.chars)
                        .map_or(line.len(), |(idx, _)| idx);
                    &line[..end]
                } else {
                    ""
                }
            })
            .collect()
    }

    pub fn cursor_line(&self) -> usize {
        if self.is_complete() {
            self.lines.len().saturating_sub(1)
        } else {
            self.line
        }
    }
}

/// State the timers mutate.
pub struct IntroState {
    pub typewriter: Typewriter,
    pub cursor_visible: bool,
    pub scene_started: bool,
}

pub struct Intro {
    event_loop: EventLoop<'static, IntroState>,
    state: IntroState,
    timings: IntroTimings,
    typing: Option<RegistrationToken>,
    blink: Option<RegistrationToken>,
    started: bool,
}

impl Intro {
    pub fn new(lines: Vec<String>, timings: IntroTimings) -> Result<Self> {
        let event_loop = EventLoop::try_new()?;
        let mut intro = Self {
            event_loop,
            state: IntroState {
                typewriter: Typewriter::new(lines),
                cursor_visible: true,
                scene_started: false,
            },
            timings,
            typing: None,
            blink: None,
            started: false,
        };

        let blink = timings.cursor_blink;
        let token = intro
            .event_loop
            .handle()
            .insert_source(Timer::from_duration(blink), move |_, _, state: &mut IntroState| {
                state.cursor_visible = !state.cursor_visible;
                TimeoutAction::ToDuration(blink)
            })
            .map_err(|e| anyhow!("Failed to register cursor timer: {}", e.error))?;
        intro.blink = Some(token);

        Ok(intro)
    }

    pub fn state(&self) -> &IntroState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn scene_started(&self) -> bool {
        self.state.scene_started
    }

    /// Begins revealing text. Calling again is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        info!("Intro typing started");

        let IntroTimings {
            char_delay,
            post_typing_delay,
            ..
        } = self.timings;
        let first = if self.state.typewriter.is_complete() {
            post_typing_delay
        } else {
            char_delay
        };

        let token = self
            .event_loop
            .handle()
            .insert_source(Timer::from_duration(first), move |_, _, state: &mut IntroState| {
                if state.typewriter.is_complete() {
                    state.scene_started = true;
                    info!("Intro finished, starting scene");
                    return TimeoutAction::Drop;
                }
                state.typewriter.advance();
                if state.typewriter.is_complete() {
                    debug!("Typing complete");
                    TimeoutAction::ToDuration(post_typing_delay)
                } else {
                    TimeoutAction::ToDuration(char_delay)
                }
            })
            .map_err(|e| anyhow!("Failed to register typing timer: {}", e.error))?;
        self.typing = Some(token);
        Ok(())
    }

    /// Runs any timers that are due without blocking.
    pub fn dispatch(&mut self) -> Result<()> {
        self.event_loop
            .dispatch(Some(Duration::ZERO), &mut self.state)?;
        Ok(())
    }

    /// Drops every pending timer.
    pub fn cancel(&mut self) {
        let handle = self.event_loop.handle();
        for token in [self.typing.take(), self.blink.take()].into_iter().flatten() {
            handle.remove(token);
        }
        debug!("Intro timers cancelled");
    }

    fn cursor_shown(&self) -> bool {
        self.state.cursor_visible && !self.state.scene_started
    }
}

impl Feature for Intro {
    fn name(&self) -> &'static str {
        "intro"
    }

    fn update(&mut self, _dt: f32, _now: f32) {
        if let Err(e) = self.dispatch() {
            log::warn!("Intro timer dispatch failed: {}", e);
        }
    }

    fn render(&self, draw: &mut DrawContext, view: &View) {
        let opacity = view.backdrop_opacity;
        if opacity <= 0.0 {
            return;
        }
        let vp = view.viewport;
        draw.rect(vp.x, vp.y, vp.width, vp.height, view.palette.backdrop.with_alpha(opacity));

        let lines = self.state.typewriter.visible_lines();
        let pixel = (vp.height / 220.0).floor().max(2.0);
        let line_height = (font::GLYPH_HEIGHT as f32 + 5.0) * pixel;
        let block_height = lines.len() as f32 * line_height;
        let x = vp.x + vp.width * 0.12;
        let mut y = vp.y + (vp.height - block_height) * 0.5;

        let text_color = view.palette.text.with_alpha(opacity);
        let cursor_line = self.state.typewriter.cursor_line();
        for (i, line) in lines.iter().enumerate() {
            let advance = draw.text(line, x, y, pixel, text_color);
            if i == cursor_line && self.cursor_shown() {
                draw.text("_", x + advance, y, pixel, view.palette.accent.with_alpha(opacity));
            }
            y += line_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fast() -> IntroTimings {
        IntroTimings {
            char_delay: Duration::from_millis(1),
            post_typing_delay: Duration::from_millis(5),
            cursor_blink: Duration::from_millis(2),
        }
    }

    fn pump_until(intro: &mut Intro, done: impl Fn(&Intro) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            intro.dispatch().unwrap();
            if done(intro) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn typewriter_reveals_one_character_per_step() {
        let mut tw = Typewriter::new(lines(&["ab", "", "c"]));
        assert_eq!(tw.visible_lines(), vec!["", "", ""]);

        tw.advance();
        assert_eq!(tw.visible_lines(), vec!["a", "", ""]);
        tw.advance();
        assert_eq!(tw.visible_lines(), vec!["ab", "", ""]);
        assert_eq!(tw.cursor_line(), 0);

        // Line break, the empty line, then its break.
        tw.advance();
        assert_eq!(tw.cursor_line(), 1);
        tw.advance();
        assert_eq!(tw.cursor_line(), 2);
        tw.advance();
        assert_eq!(tw.visible_lines(), vec!["ab", "", "c"]);
        assert!(!tw.is_complete());
        tw.advance();
        assert!(tw.is_complete());
        assert_eq!(tw.cursor_line(), 2);

        tw.advance();
        assert_eq!(tw.visible_lines(), vec!["ab", "", "c"]);
    }

    #[test]
    fn typewriter_handles_multibyte_text() {
        let mut tw = Typewriter::new(lines(&["♡x"]));
        tw.advance();
        assert_eq!(tw.visible_lines(), vec!["♡"]);
    }

    #[test]
    fn nothing_types_before_start() {
        let mut intro = Intro::new(lines(&["hello"]), fast()).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        intro.dispatch().unwrap();
        assert_eq!(intro.state().typewriter.visible_lines(), vec![""]);
        assert!(!intro.scene_started());
    }

    #[test]
    fn timers_type_everything_then_start_scene() {
        let mut intro = Intro::new(lines(&["hi", "there"]), fast()).unwrap();
        intro.start().unwrap();
        intro.start().unwrap();
        assert!(pump_until(&mut intro, |i| i.scene_started()));
        assert!(intro.state().typewriter.is_complete());
        assert_eq!(intro.state().typewriter.visible_lines(), vec!["hi", "there"]);
        assert!(!intro.cursor_shown());
    }

    #[test]
    fn empty_intro_still_waits_then_starts() {
        let mut intro = Intro::new(Vec::new(), fast()).unwrap();
        intro.start().unwrap();
        assert!(pump_until(&mut intro, |i| i.scene_started()));
    }

    #[test]
    fn cursor_blinks() {
        let mut intro = Intro::new(lines(&["x"]), fast()).unwrap();
        assert!(pump_until(&mut intro, |i| !i.state().cursor_visible));
    }

    #[test]
    fn cancel_stops_pending_timers() {
        let mut intro = Intro::new(lines(&["a long line of text"]), fast()).unwrap();
        intro.start().unwrap();
        intro.cancel();
        std::thread::sleep(Duration::from_millis(20));
        intro.dispatch().unwrap();
        assert_eq!(intro.state().typewriter.visible_lines(), vec![""]);
        assert!(intro.state().cursor_visible);
    }
}
