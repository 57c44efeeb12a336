//! The scripted intro sequence: cake descent, table slide, candle drop and
//! the backdrop cross-fade, all sampled from elapsed time since play began.

use crate::gfx::anim::{clamp01, Schedule};
use log::{debug, info};
use std::f32::consts::TAU;

pub const CAKE_START_Y: f32 = 10.0;
pub const CAKE_END_Y: f32 = 0.0;
pub const CAKE_DESCENT_DURATION: f32 = 3.0;

pub const TABLE_START_Z: f32 = 30.0;
pub const TABLE_END_Z: f32 = 0.0;
pub const TABLE_SLIDE_DURATION: f32 = 0.7;
/// Lands 0.4s ahead of the cake.
pub const TABLE_SLIDE_START: f32 = 1.9;

pub const CANDLE_START_Y: f32 = 5.0;
pub const CANDLE_END_Y: f32 = 0.0;
pub const CANDLE_DROP_DURATION: f32 = 1.2;
/// One second after both the cake and the table have settled.
pub const CANDLE_DROP_START: f32 = 4.0;

pub const BACKGROUND_FADE_START: f32 = 2.0;
pub const BACKGROUND_FADE_DURATION: f32 = 1.0;

pub const TOTAL_DURATION: f32 = CANDLE_DROP_START + CANDLE_DROP_DURATION;

/// Minimum change before a cross-fade value is re-emitted.
pub const EMIT_THRESHOLD: f32 = 0.005;

pub const CAKE_DESCENT: Schedule =
    Schedule::new(0.0, CAKE_DESCENT_DURATION, CAKE_START_Y, CAKE_END_Y);
pub const TABLE_SLIDE: Schedule =
    Schedule::new(TABLE_SLIDE_START, TABLE_SLIDE_DURATION, TABLE_START_Z, TABLE_END_Z);
pub const CANDLE_DROP: Schedule =
    Schedule::new(CANDLE_DROP_START, CANDLE_DROP_DURATION, CANDLE_START_Y, CANDLE_END_Y);
/// Drives background opacity from 1 down to 0.
pub const BACKGROUND_FADE: Schedule =
    Schedule::new(BACKGROUND_FADE_START, BACKGROUND_FADE_DURATION, 1.0, 0.0);

/// Transforms for the three animated groups at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePose {
    pub cake_y: f32,
    /// Rotation about the vertical axis, radians.
    pub cake_spin: f32,
    pub table_z: f32,
    pub candle_y: f32,
    pub candle_visible: bool,
}

impl ScenePose {
    /// Pose at `elapsed` seconds into the sequence.
    pub fn sample(elapsed: f32) -> Self {
        let elapsed = elapsed.clamp(0.0, TOTAL_DURATION);
        Self {
            cake_y: CAKE_DESCENT.value(elapsed),
            cake_spin: CAKE_DESCENT.eased_progress(elapsed) * TAU,
            table_z: TABLE_SLIDE.value(elapsed),
            candle_y: CANDLE_DROP.value(elapsed),
            candle_visible: CANDLE_DROP.has_started(elapsed),
        }
    }

    pub fn rest() -> Self {
        Self::sample(0.0)
    }
}

/// Background opacity at `elapsed`; environment progress is its complement.
pub fn background_opacity(elapsed: f32) -> f32 {
    BACKGROUND_FADE.value(elapsed.clamp(0.0, TOTAL_DURATION))
}

/// Receives the driver's outputs. Every method defaults to a no-op.
pub trait TimelineListener {
    fn background_opacity_changed(&mut self, _opacity: f32) {}
    fn environment_progress_changed(&mut self, _progress: f32) {}
    fn sequence_completed(&mut self) {}
}

impl TimelineListener for () {}

/// Remembers the last emitted value and only lets meaningful changes through.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEmitter {
    last: f32,
    threshold: f32,
}

impl ThresholdEmitter {
    pub fn new(initial: f32, threshold: f32) -> Self {
        Self {
            last: clamp01(initial),
            threshold,
        }
    }

    pub fn last(&self) -> f32 {
        self.last
    }

    /// Returns the clamped value when it should be emitted. Endpoints always
    /// land exactly even if the final step is below the threshold.
    pub fn offer(&mut self, value: f32) -> Option<f32> {
        let clamped = clamp01(value);
        let delta = (clamped - self.last).abs();
        let at_endpoint = clamped == 0.0 || clamped == 1.0;
        if delta > self.threshold || (at_endpoint && delta > 0.0) {
            self.last = clamped;
            Some(clamped)
        } else {
            None
        }
    }
}

/// Everything the renderer needs from one driver step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineFrame {
    pub pose: ScenePose,
    pub elapsed: f32,
    pub background_opacity: f32,
    pub environment_progress: f32,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct TimelineDriver {
    start_time: Option<f32>,
    completed: bool,
    notified: bool,
    opacity: ThresholdEmitter,
    environment: ThresholdEmitter,
}

impl TimelineDriver {
    pub fn new() -> Self {
        Self {
            start_time: None,
            completed: false,
            notified: false,
            opacity: ThresholdEmitter::new(1.0, EMIT_THRESHOLD),
            environment: ThresholdEmitter::new(0.0, EMIT_THRESHOLD),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn start_time(&self) -> Option<f32> {
        self.start_time
    }

    /// Pushes the current cross-fade values unconditionally so a fresh
    /// listener starts in sync.
    pub fn prime<L: TimelineListener>(&self, listener: &mut L) {
        listener.background_opacity_changed(self.opacity.last());
        listener.environment_progress_changed(self.environment.last());
    }

    /// Advances the sequence to `clock` seconds. Call once per frame.
    pub fn step<L: TimelineListener>(
        &mut self,
        clock: f32,
        is_playing: bool,
        listener: &mut L,
    ) -> TimelineFrame {
        if !is_playing {
            if self.start_time.take().is_some() {
                debug!("Timeline reset");
            }
            self.completed = false;
            self.notified = false;
            self.emit(1.0, listener);
            return TimelineFrame {
                pose: ScenePose::rest(),
                elapsed: 0.0,
                background_opacity: 1.0,
                environment_progress: 0.0,
                completed: false,
            };
        }

        let start = *self.start_time.get_or_insert_with(|| {
            debug!("Timeline started at {:.3}", clock);
            clock
        });

        if self.completed {
            self.emit(0.0, listener);
            return Self::terminal_frame();
        }

        let elapsed = (clock - start).clamp(0.0, TOTAL_DURATION);
        let opacity = background_opacity(elapsed);
        self.emit(opacity, listener);

        if elapsed >= TOTAL_DURATION {
            self.completed = true;
            self.emit(0.0, listener);
            if !self.notified {
                self.notified = true;
                info!("Intro sequence complete after {:.2}s", elapsed);
                listener.sequence_completed();
            }
            return Self::terminal_frame();
        }

        TimelineFrame {
            pose: ScenePose::sample(elapsed),
            elapsed,
            background_opacity: opacity,
            environment_progress: 1.0 - opacity,
            completed: false,
        }
    }

    fn terminal_frame() -> TimelineFrame {
        TimelineFrame {
            pose: ScenePose::sample(TOTAL_DURATION),
            elapsed: TOTAL_DURATION,
            background_opacity: 0.0,
            environment_progress: 1.0,
            completed: true,
        }
    }

    fn emit<L: TimelineListener>(&mut self, opacity: f32, listener: &mut L) {
        if let Some(value) = self.opacity.offer(opacity) {
            listener.background_opacity_changed(value);
        }
        if let Some(value) = self.environment.offer(1.0 - opacity) {
            listener.environment_progress_changed(value);
        }
    }
}

impl Default for TimelineDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        opacity: Vec<f32>,
        environment: Vec<f32>,
        completions: u32,
    }

    impl TimelineListener for Recorder {
        fn background_opacity_changed(&mut self, opacity: f32) {
            self.opacity.push(opacity);
        }
        fn environment_progress_changed(&mut self, progress: f32) {
            self.environment.push(progress);
        }
        fn sequence_completed(&mut self) {
            self.completions += 1;
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    const SCHEDULES: [Schedule; 4] = [CAKE_DESCENT, TABLE_SLIDE, CANDLE_DROP, BACKGROUND_FADE];

    #[test]
    fn constants_keep_their_tuned_values() {
        assert!(approx(TOTAL_DURATION, 5.2));
        assert!(approx(TABLE_SLIDE.end_time(), 2.6));
        assert!(CANDLE_DROP_START >= CAKE_DESCENT.end_time().max(TABLE_SLIDE.end_time()) + 1.0 - 1e-6);
    }

    #[test]
    fn progress_stays_in_unit_range_and_never_decreases() {
        for schedule in SCHEDULES {
            let mut previous = 0.0;
            for i in 0..=520 {
                let elapsed = i as f32 * TOTAL_DURATION / 520.0;
                let p = schedule.progress(elapsed);
                assert!((0.0..=1.0).contains(&p), "progress {p} at {elapsed}");
                assert!(p >= previous, "progress went backwards at {elapsed}");
                previous = p;
            }
        }
    }

    #[test]
    fn start_and_end_poses() {
        let start = ScenePose::sample(0.0);
        assert_eq!(start.cake_y, CAKE_START_Y);
        assert_eq!(start.table_z, TABLE_START_Z);
        assert_eq!(start.candle_y, CANDLE_START_Y);
        assert!(!start.candle_visible);

        let end = ScenePose::sample(TOTAL_DURATION);
        assert_eq!(end.cake_y, CAKE_END_Y);
        assert_eq!(end.table_z, TABLE_END_Z);
        assert_eq!(end.candle_y, CANDLE_END_Y);
        assert!(end.candle_visible);
        assert!(approx(end.cake_spin, TAU));
        assert_eq!(background_opacity(TOTAL_DURATION), 0.0);
    }

    #[test]
    fn cake_halfway_through_descent() {
        let pose = ScenePose::sample(1.5);
        assert!(approx(pose.cake_y, 1.25), "cake_y = {}", pose.cake_y);
    }

    #[test]
    fn table_slide_window() {
        assert!(approx(ScenePose::sample(1.9).table_z, 30.0));
        assert!(approx(ScenePose::sample(1.0).table_z, 30.0));
        assert!(approx(ScenePose::sample(2.6).table_z, 0.0));
        let mid = ScenePose::sample(2.25).table_z;
        assert!(mid > 0.0 && mid < 30.0);
    }

    #[test]
    fn candle_appears_at_drop_start() {
        assert!(!ScenePose::sample(3.99).candle_visible);
        let pose = ScenePose::sample(CANDLE_DROP_START);
        assert!(pose.candle_visible);
        assert_eq!(pose.candle_y, CANDLE_START_Y);
    }

    #[test]
    fn first_playing_frame_latches_start_time() {
        let mut driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        let frame = driver.step(42.0, true, &mut rec);
        assert_eq!(driver.start_time(), Some(42.0));
        assert_eq!(frame.elapsed, 0.0);
        assert_eq!(frame.pose, ScenePose::rest());

        let frame = driver.step(43.5, true, &mut rec);
        assert!(approx(frame.elapsed, 1.5));
        assert!(approx(frame.pose.cake_y, 1.25));
    }

    #[test]
    fn clock_before_start_clamps_to_zero() {
        let mut driver = TimelineDriver::new();
        driver.step(10.0, true, &mut ());
        let frame = driver.step(9.0, true, &mut ());
        assert_eq!(frame.elapsed, 0.0);
    }

    #[test]
    fn completion_fires_once_per_session() {
        let mut driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        driver.step(0.0, true, &mut rec);
        for i in 1..=200 {
            let frame = driver.step(i as f32 * 0.05, true, &mut rec);
            if frame.completed {
                assert_eq!(frame.background_opacity, 0.0);
                assert_eq!(frame.environment_progress, 1.0);
                assert_eq!(frame.pose, ScenePose::sample(TOTAL_DURATION));
            }
        }
        assert!(driver.is_completed());
        assert_eq!(rec.completions, 1);
        assert_eq!(rec.opacity.last(), Some(&0.0));
        assert_eq!(rec.environment.last(), Some(&1.0));

        // Cancelling starts a new session which may complete once more.
        driver.step(20.0, false, &mut rec);
        assert!(!driver.is_completed());
        driver.step(30.0, true, &mut rec);
        driver.step(40.0, true, &mut rec);
        driver.step(41.0, true, &mut rec);
        assert_eq!(rec.completions, 2);
    }

    #[test]
    fn completes_on_the_frame_that_reaches_total() {
        let mut driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        driver.step(0.0, true, &mut rec);
        let frame = driver.step(TOTAL_DURATION, true, &mut rec);
        assert!(frame.completed);
        assert_eq!(rec.completions, 1);
    }

    #[test]
    fn stopped_driver_is_idempotent() {
        let mut driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        driver.step(0.0, true, &mut rec);
        driver.step(2.5, true, &mut rec);

        for i in 0..10 {
            let frame = driver.step(3.0 + i as f32, false, &mut rec);
            assert_eq!(frame.background_opacity, 1.0);
            assert_eq!(frame.environment_progress, 0.0);
            assert!(!frame.completed);
            assert_eq!(driver.start_time(), None);
        }
        assert_eq!(rec.opacity.last(), Some(&1.0));
        assert_eq!(rec.environment.last(), Some(&0.0));
        // The reset is reported once, not on every stopped frame.
        let resets = rec.opacity.iter().filter(|v| **v == 1.0).count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn fade_values_are_complementary_and_thresholded() {
        let mut driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        driver.step(0.0, true, &mut rec);
        // Nothing to report before the fade begins.
        driver.step(1.0, true, &mut rec);
        assert!(rec.opacity.is_empty());

        let mut t = 2.0;
        while t < 3.2 {
            driver.step(t, true, &mut rec);
            t += 0.001;
        }
        assert!(rec.opacity.len() > 10);
        for pair in rec.opacity.windows(2) {
            let step = (pair[0] - pair[1]).abs();
            assert!(step > EMIT_THRESHOLD || pair[1] == 0.0);
        }
        for pair in rec.environment.windows(2) {
            let step = (pair[0] - pair[1]).abs();
            assert!(step > EMIT_THRESHOLD || pair[1] == 1.0);
        }
        assert_eq!(rec.opacity.last(), Some(&0.0));
        assert_eq!(rec.environment.last(), Some(&1.0));
    }

    #[test]
    fn threshold_emitter_lands_endpoints() {
        let mut emitter = ThresholdEmitter::new(0.003, EMIT_THRESHOLD);
        assert_eq!(emitter.offer(0.001), None);
        assert_eq!(emitter.offer(0.0), Some(0.0));
        assert_eq!(emitter.offer(0.0), None);
        assert_eq!(emitter.offer(-3.0), None);
        assert_eq!(emitter.offer(2.0), Some(1.0));
    }

    #[test]
    fn prime_reports_current_values() {
        let driver = TimelineDriver::new();
        let mut rec = Recorder::default();
        driver.prime(&mut rec);
        assert_eq!(rec.opacity, vec![1.0]);
        assert_eq!(rec.environment, vec![0.0]);
    }
}
