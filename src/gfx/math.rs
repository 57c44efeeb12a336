#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `h` in [0, 1), full saturation/value scaled by `v`.
    pub fn from_hue(h: f32, v: f32) -> Self {
        let h6 = (h.fract() + 1.0).fract() * 6.0;
        let x = 1.0 - (h6 % 2.0 - 1.0).abs();
        let (r, g, b) = match h6 as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Self::new(r * v, g * v, b * v, 1.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn scaled(self, k: f32) -> Self {
        Self::new(
            (self.r * k).min(1.0),
            (self.g * k).min(1.0),
            (self.b * k).min(1.0),
            self.a,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::from_hex("00000080").map(|c| c.a), Some(128.0 / 255.0));
        assert_eq!(Color::from_hex("#abc"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn hue_wheel_primaries() {
        assert_eq!(Color::from_hue(0.0, 1.0), Color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(Color::from_hue(0.5, 0.5), Color::new(0.0, 0.5, 0.5, 1.0));
    }

    #[test]
    fn scaled_clamps_and_keeps_alpha() {
        let c = Color::new(0.6, 0.2, 0.0, 0.5).scaled(2.0);
        assert_eq!(c, Color::new(1.0, 0.4, 0.0, 0.5));
    }
}
