use std::path::PathBuf;

use clap::Parser;
use flipconfig::{FilterSetting, HexColor};

#[derive(Parser, Debug)]
#[command(
    name = "flipview",
    author,
    version,
    about = "Flip through images and colour panels with a folding-page transition"
)]
pub struct Cli {
    /// Images to show as panels, in order. Appended after configured panels.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    /// Flip configuration TOML file.
    #[arg(long, short, value_name = "PATH", env = "FLIPVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Solid colour panel (`#rrggbb` or `#rrggbbaa`); may be repeated.
    #[arg(long = "color", value_name = "HEX", value_parser = parse_color)]
    pub colors: Vec<HexColor>,

    /// Window size in physical pixels (e.g. `540x960`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Override the easing rate (fraction of remaining distance per millisecond).
    #[arg(long, value_name = "RATE")]
    pub easing_rate: Option<f32>,

    /// Snapshot sampling filter: `nearest` or `linear`.
    #[arg(long, value_name = "FILTER", value_parser = parse_filter)]
    pub filter: Option<FilterSetting>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_color(value: &str) -> Result<HexColor, String> {
    HexColor::parse(value)
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 540x960".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_filter(value: &str) -> Result<FilterSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "nearest" | "point" => Ok(FilterSetting::Nearest),
        "linear" | "bilinear" => Ok(FilterSetting::Linear),
        other => Err(format!("unknown filter '{other}'; expected nearest or linear")),
    }
}
