use crate::gfx::anim::Timeline;
use log::info;

const EXTINGUISH_DURATION: f32 = 0.3;

pub struct Candle {
    lit: bool,
    extinguish: Timeline,
}

impl Candle {
    pub fn new() -> Self {
        Self {
            lit: true,
            extinguish: Timeline::new(EXTINGUISH_DURATION),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Puts the flame out. Returns false if it was already out.
    pub fn blow_out(&mut self, now: f32) -> bool {
        if !self.lit {
            return false;
        }
        self.lit = false;
        self.extinguish.start(now);
        info!("Candle blown out");
        true
    }

    pub fn update(&mut self, now: f32) {
        if !self.lit {
            self.extinguish.update(now);
        }
    }

    /// Flame size multiplier in [0, 1]; flickers while lit.
    pub fn flame_strength(&self, time: f32) -> f32 {
        if self.lit {
            let flicker = (time * 9.0).sin() * 0.5 + (time * 23.0 + 1.3).sin() * 0.3;
            (0.88 + flicker * 0.1).clamp(0.0, 1.0)
        } else {
            1.0 - self.extinguish.eased_progress()
        }
    }
}

impl Default for Candle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blow_out_only_once() {
        let mut candle = Candle::new();
        assert!(candle.is_lit());
        assert!(candle.blow_out(5.0));
        assert!(!candle.blow_out(5.1));
        assert!(!candle.is_lit());
    }

    #[test]
    fn flame_fades_after_blow_out() {
        let mut candle = Candle::new();
        for i in 0..100 {
            let s = candle.flame_strength(i as f32 * 0.037);
            assert!(s > 0.7 && s <= 1.0);
        }

        candle.blow_out(2.0);
        candle.update(2.0);
        assert_eq!(candle.flame_strength(2.0), 1.0);
        candle.update(2.15);
        let mid = candle.flame_strength(2.15);
        assert!(mid > 0.0 && mid < 1.0);
        candle.update(2.5);
        assert_eq!(candle.flame_strength(2.5), 0.0);
    }
}
