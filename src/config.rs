use crate::features::intro::IntroTimings;
use crate::gfx::math::Color;
use crate::scene::focus::CardDescriptor;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_fps_cap")]
    pub fps_cap: u32,

    #[serde(default)]
    pub intro: IntroConfig,

    #[serde(default)]
    pub music: MusicConfig,

    #[serde(default = "default_cards")]
    pub cards: Vec<CardDescriptor>,

    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroConfig {
    #[serde(default = "default_lines")]
    pub lines: Vec<String>,
    #[serde(default = "default_char_delay_ms")]
    pub char_delay_ms: u64,
    #[serde(default = "default_post_typing_delay_ms")]
    pub post_typing_delay_ms: u64,
    #[serde(default = "default_cursor_blink_ms")]
    pub cursor_blink_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Player command and arguments. Empty disables music.
    #[serde(default = "default_music_command")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_backdrop")]
    pub backdrop: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_accent")]
    pub accent: String,
}

/// Theme colours resolved for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub backdrop: Color,
    pub text: Color,
    pub accent: Color,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps_cap: default_fps_cap(),
            intro: IntroConfig::default(),
            music: MusicConfig::default(),
            cards: default_cards(),
            theme: Theme::default(),
        }
    }
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            char_delay_ms: default_char_delay_ms(),
            post_typing_delay_ms: default_post_typing_delay_ms(),
            cursor_blink_ms: default_cursor_blink_ms(),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            command: default_music_command(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            backdrop: default_backdrop(),
            text: default_text(),
            accent: default_accent(),
        }
    }
}

fn default_fps_cap() -> u32 {
    60
}

fn default_lines() -> Vec<String> {
    [
        "> hello you",
        "...",
        "> today is a special day",
        "...",
        "> so here is a little something ♡",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_char_delay_ms() -> u64 {
    100
}

fn default_post_typing_delay_ms() -> u64 {
    1000
}

fn default_cursor_blink_ms() -> u64 {
    480
}

fn default_music_command() -> Vec<String> {
    let music = config_dir()
        .map(|dir| dir.join("music.mp3"))
        .unwrap_or_else(|| PathBuf::from("music.mp3"));
    vec![
        "mpv".to_string(),
        "--no-video".to_string(),
        "--really-quiet".to_string(),
        "--loop=inf".to_string(),
        music.to_string_lossy().into_owned(),
    ]
}

fn default_cards() -> Vec<CardDescriptor> {
    vec![CardDescriptor {
        id: "confetti".to_string(),
        image: "card.png".to_string(),
        position: [1.0, 0.745, -2.0],
        rotation: [-FRAC_PI_2, 0.0, PI / 3.0],
    }]
}

fn default_backdrop() -> String {
    "#000000".to_string()
}

fn default_text() -> String {
    "#f2f2f2".to_string()
}

fn default_accent() -> String {
    "#ffb347".to_string()
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("candlelight"))
}

impl IntroConfig {
    pub fn timings(&self) -> IntroTimings {
        IntroTimings {
            char_delay: Duration::from_millis(self.char_delay_ms),
            post_typing_delay: Duration::from_millis(self.post_typing_delay_ms),
            cursor_blink: Duration::from_millis(self.cursor_blink_ms.max(1)),
        }
    }
}

impl Theme {
    /// Unparseable colours fall back to the defaults.
    pub fn palette(&self) -> Palette {
        let parse = |value: &str, fallback: fn() -> String| {
            Color::from_hex(value)
                .or_else(|| Color::from_hex(&fallback()))
                .unwrap_or(Color::new(1.0, 1.0, 1.0, 1.0))
        };
        Palette {
            backdrop: parse(&self.backdrop, default_backdrop),
            text: parse(&self.text, default_text),
            accent: parse(&self.accent, default_accent),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let dir = config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::parse(&contents)
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::path()?;
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.fps_cap, 60);
        assert_eq!(config.intro.lines, default_lines());
        assert_eq!(config.cards.len(), 1);
        assert_eq!(config.cards[0].id, "confetti");
        assert_eq!(config.intro.timings(), IntroTimings::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r##"
            fps_cap = 30

            [intro]
            lines = ["> hi"]
            char_delay_ms = 50

            [music]
            command = []

            [theme]
            accent = "#00ff00"

            [[cards]]
            id = "note"
            position = [0.0, 0.75, 1.0]
            rotation = [0.0, 0.0, 0.0]
            "##,
        )
        .unwrap();

        assert_eq!(config.fps_cap, 30);
        assert_eq!(config.intro.lines, vec!["> hi".to_string()]);
        assert_eq!(config.intro.char_delay_ms, 50);
        assert_eq!(config.intro.cursor_blink_ms, 480);
        assert!(config.music.command.is_empty());
        assert_eq!(config.cards.len(), 1);
        assert_eq!(config.cards[0].id, "note");
        assert_eq!(config.cards[0].image, "");

        let palette = config.theme.palette();
        assert_eq!(palette.accent, Color::rgba(0, 255, 0, 255));
        assert_eq!(palette.backdrop, Color::rgba(0, 0, 0, 255));
    }

    #[test]
    fn bad_colours_fall_back() {
        let theme = Theme {
            text: "not a colour".to_string(),
            ..Theme::default()
        };
        assert_eq!(theme.palette().text, Color::from_hex(&default_text()).unwrap());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::parse("fps_cap = \"fast\"").is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.cards, config.cards);
        assert_eq!(back.intro.lines, config.intro.lines);
    }
}
