use anyhow::{bail, Result};
use flipconfig::{
    ColorSpaceSetting, FilterSetting, FlipConfig, HexColor, PanelSource, PowerSetting,
};
use pageflip::{
    AnimationSettings, ColorSpaceMode, GpuPowerPreference, RenderSettings, TextureFilter,
};

use crate::cli::Cli;

const DEFAULT_WINDOW_SIZE: (u32, u32) = (540, 960);

/// Shown when neither the config nor the command line names any panel.
const DEMO_COLORS: [[u8; 4]; 4] = [
    [0x2e, 0x34, 0x40, 0xff],
    [0x5e, 0x81, 0xac, 0xff],
    [0xa3, 0xbe, 0x8c, 0xff],
    [0xeb, 0xcb, 0x8b, 0xff],
];

/// Everything the viewer needs, merged from config file and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSettings {
    pub window_size: (u32, u32),
    pub animation: AnimationSettings,
    pub render: RenderSettings,
    pub panels: Vec<PanelSource>,
}

pub fn resolve(args: &Cli, config: &FlipConfig) -> Result<ViewerSettings> {
    let mut animation = AnimationSettings {
        easing_rate: config.animation.easing_rate,
        settle_epsilon: config.animation.settle_epsilon,
    };
    if let Some(rate) = args.easing_rate {
        if !rate.is_finite() || rate <= 0.0 {
            bail!("--easing-rate must be a positive number, got {rate}");
        }
        animation.easing_rate = rate;
    }

    let render = RenderSettings {
        filter: map_filter(args.filter.unwrap_or(config.render.filter)),
        power: map_power(config.render.power),
        color_space: map_color_space(config.render.color_space),
        clear_color: config.render.clear_color,
    };

    let mut panels = config.panel_sources();
    panels.extend(args.images.iter().cloned().map(PanelSource::Image));
    panels.extend(args.colors.iter().copied().map(PanelSource::Color));
    if panels.is_empty() {
        tracing::info!("no panels configured; showing demo colours");
        panels = DEMO_COLORS
            .iter()
            .map(|rgba| PanelSource::Color(HexColor(*rgba)))
            .collect();
    }

    Ok(ViewerSettings {
        window_size: args.size.unwrap_or(DEFAULT_WINDOW_SIZE),
        animation,
        render,
        panels,
    })
}

pub fn map_filter(filter: FilterSetting) -> TextureFilter {
    match filter {
        FilterSetting::Nearest => TextureFilter::Nearest,
        FilterSetting::Linear => TextureFilter::Linear,
    }
}

pub fn map_power(power: PowerSetting) -> GpuPowerPreference {
    match power {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    }
}

pub fn map_color_space(mode: ColorSpaceSetting) -> ColorSpaceMode {
    match mode {
        ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
        ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
        ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
    }
}
