use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_EASING_RATE: f32 = 0.01;
pub const DEFAULT_SETTLE_EPSILON: f32 = 0.01;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpaceSetting {
    #[default]
    Auto,
    Gamma,
    Linear,
}

/// RGBA colour written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor(pub [u8; 4]);

impl HexColor {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let digits = raw
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{raw}' must start with '#'"))?;
        if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("colour '{raw}' must be #rrggbb or #rrggbbaa"));
        }
        let channel = |index: usize| {
            digits
                .get(index * 2..index * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        let mut rgba = [0, 0, 0, 255];
        for (index, slot) in rgba.iter_mut().enumerate().take(digits.len() / 2) {
            *slot = channel(index).ok_or_else(|| format!("colour '{raw}' is malformed"))?;
        }
        Ok(Self(rgba))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")?;
        if a != 255 {
            write!(f, "{a:02x}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        HexColor::parse(&raw).map_err(de::Error::custom)
    }
}

impl Serialize for HexColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationConfig {
    #[serde(default = "default_easing_rate")]
    pub easing_rate: f32,
    #[serde(default = "default_settle_epsilon")]
    pub settle_epsilon: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            easing_rate: DEFAULT_EASING_RATE,
            settle_epsilon: DEFAULT_SETTLE_EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default)]
    pub filter: FilterSetting,
    #[serde(default)]
    pub power: PowerSetting,
    #[serde(default)]
    pub color_space: ColorSpaceSetting,
    #[serde(default = "default_clear_color")]
    pub clear_color: [f64; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            filter: FilterSetting::default(),
            power: PowerSetting::default(),
            color_space: ColorSpaceSetting::default(),
            clear_color: default_clear_color(),
        }
    }
}

/// One `[[panels]]` entry; exactly one of `image` and `color` is set.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PanelEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<HexColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelSource {
    Image(PathBuf),
    Color(HexColor),
}

impl PanelEntry {
    pub fn source(&self) -> Option<PanelSource> {
        match (&self.image, self.color) {
            (Some(path), None) => Some(PanelSource::Image(path.clone())),
            (None, Some(color)) => Some(PanelSource::Color(color)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlipConfig {
    pub version: u32,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub panels: Vec<PanelEntry>,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            animation: AnimationConfig::default(),
            render: RenderConfig::default(),
            panels: Vec::new(),
        }
    }
}

fn default_easing_rate() -> f32 {
    DEFAULT_EASING_RATE
}

fn default_settle_epsilon() -> f32 {
    DEFAULT_SETTLE_EPSILON
}

fn default_clear_color() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl FlipConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FlipConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file. Relative image paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&input)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for panel in &mut self.panels {
            if let Some(image) = panel.image.as_mut() {
                if image.is_relative() {
                    *image = base.join(&*image);
                }
            }
        }
    }

    pub fn panel_sources(&self) -> Vec<PanelSource> {
        self.panels.iter().filter_map(PanelEntry::source).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let rate = self.animation.easing_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "animation.easing_rate must be a positive number, got {rate}"
            )));
        }

        let epsilon = self.animation.settle_epsilon;
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "animation.settle_epsilon must be between 0 and 1, got {epsilon}"
            )));
        }

        if self
            .render
            .clear_color
            .iter()
            .any(|component| !(0.0..=1.0).contains(component))
        {
            return Err(ConfigError::Invalid(
                "render.clear_color components must be within [0, 1]".into(),
            ));
        }

        for (index, panel) in self.panels.iter().enumerate() {
            match (&panel.image, &panel.color) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::Invalid(format!(
                        "panel {index} sets both image and color"
                    )))
                }
                (None, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "panel {index} needs an image or a color"
                    )))
                }
                (Some(path), None) if path.as_os_str().is_empty() => {
                    return Err(ConfigError::Invalid(format!(
                        "panel {index} has an empty image path"
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r##"
version = 1

[animation]
easing_rate = 0.02
settle_epsilon = 0.005

[render]
filter = "linear"
power = "low"
color_space = "linear"
clear_color = [0.1, 0.1, 0.1, 1.0]

[[panels]]
image = "pages/one.png"

[[panels]]
color = "#3366cc"

[[panels]]
color = "#ff000080"
"##;

    #[test]
    fn parses_sample_config() {
        let config = FlipConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.animation.easing_rate, 0.02);
        assert_eq!(config.animation.settle_epsilon, 0.005);
        assert_eq!(config.render.filter, FilterSetting::Linear);
        assert_eq!(config.render.power, PowerSetting::Low);
        assert_eq!(config.render.color_space, ColorSpaceSetting::Linear);
        assert_eq!(
            config.panel_sources(),
            vec![
                PanelSource::Image(PathBuf::from("pages/one.png")),
                PanelSource::Color(HexColor([0x33, 0x66, 0xcc, 0xff])),
                PanelSource::Color(HexColor([0xff, 0x00, 0x00, 0x80])),
            ]
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = FlipConfig::from_toml_str("version = 1").expect("parse config");
        assert_eq!(config, FlipConfig::default());
        assert_eq!(config.animation.easing_rate, 0.01);
        assert_eq!(config.animation.settle_epsilon, 0.01);
        assert_eq!(config.render.filter, FilterSetting::Nearest);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = FlipConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_animation_values() {
        for body in [
            "[animation]\neasing_rate = 0.0",
            "[animation]\neasing_rate = -1.0",
            "[animation]\nsettle_epsilon = 0.0",
            "[animation]\nsettle_epsilon = 1.5",
        ] {
            let input = format!("version = 1\n{body}");
            let err = FlipConfig::from_toml_str(&input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{body}");
        }
    }

    #[test]
    fn rejects_ambiguous_panels() {
        let both = "version = 1\n[[panels]]\nimage = \"a.png\"\ncolor = \"#000000\"";
        assert!(matches!(
            FlipConfig::from_toml_str(both).unwrap_err(),
            ConfigError::Invalid(_)
        ));

        let neither = "version = 1\n[[panels]]\n";
        assert!(matches!(
            FlipConfig::from_toml_str(neither).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn rejects_malformed_colours() {
        for raw in ["336699", "#12345", "#gg0000", "#1234567890"] {
            assert!(HexColor::parse(raw).is_err(), "{raw}");
        }
        let input = "version = 1\n[[panels]]\ncolor = \"blue\"";
        assert!(matches!(
            FlipConfig::from_toml_str(input).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn rejects_out_of_range_clear_color() {
        let input = "version = 1\n[render]\nclear_color = [0.0, 2.0, 0.0, 1.0]";
        assert!(matches!(
            FlipConfig::from_toml_str(input).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn colour_display_round_trips_through_parse() {
        let colour = HexColor::parse("#3366CC").expect("colour");
        assert_eq!(colour.to_string(), "#3366cc");
        let translucent = HexColor::parse("#01020304").expect("colour");
        assert_eq!(translucent.to_string(), "#01020304");
    }

    #[test]
    fn load_resolves_images_next_to_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flip.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(file, "version = 1\n[[panels]]\nimage = \"page.png\"").expect("write config");

        let config = FlipConfig::load(&path).expect("load config");
        assert_eq!(
            config.panel_sources(),
            vec![PanelSource::Image(dir.path().join("page.png"))]
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FlipConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
