/// Fast start, decelerating into the end value.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Frame-rate independent smoothing factor for chasing a target.
pub fn damp(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// A fixed time window driving one interpolated value.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub start_offset: f32,
    pub duration: f32,
    pub start_value: f32,
    pub end_value: f32,
    pub easing: fn(f32) -> f32,
}

impl Schedule {
    pub const fn new(start_offset: f32, duration: f32, start_value: f32, end_value: f32) -> Self {
        Self {
            start_offset,
            duration,
            start_value,
            end_value,
            easing: ease_out_cubic,
        }
    }

    pub fn end_time(&self) -> f32 {
        self.start_offset + self.duration
    }

    /// Linear progress through the window, always within [0, 1].
    pub fn progress(&self, elapsed: f32) -> f32 {
        if self.duration <= 0.0 {
            return if elapsed >= self.start_offset { 1.0 } else { 0.0 };
        }
        clamp01((elapsed - self.start_offset) / self.duration)
    }

    pub fn eased_progress(&self, elapsed: f32) -> f32 {
        (self.easing)(self.progress(elapsed))
    }

    pub fn value(&self, elapsed: f32) -> f32 {
        lerp(self.start_value, self.end_value, self.eased_progress(elapsed))
    }

    pub fn has_started(&self, elapsed: f32) -> bool {
        elapsed >= self.start_offset
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    pub start_time: f32,
    pub duration: f32,
    pub current_time: f32,
}

impl Timeline {
    pub fn new(duration: f32) -> Self {
        Self {
            start_time: 0.0,
            duration,
            current_time: 0.0,
        }
    }

    pub fn start(&mut self, now: f32) {
        self.start_time = now;
        self.current_time = now;
    }

    pub fn update(&mut self, now: f32) {
        self.current_time = now;
    }

    pub fn progress(&self) -> f32 {
        let elapsed = self.current_time - self.start_time;
        clamp01(elapsed / self.duration)
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn eased_progress(&self) -> f32 {
        ease_out_cubic(self.progress())
    }
}
