//! Render settings: defaults, then a TOML file, then command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use profilepic::{
    Color, FaceSelection, FrameLayout, MultiFacePolicy, OutputFormat, RenderConfig, TextAlign,
};

/// Load a TOML settings file. Missing keys keep their defaults.
pub fn load_config(path: &Path) -> Result<RenderConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("invalid config file {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<RenderConfig> {
    Ok(toml::from_str(text)?)
}

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub box_size_factor: Option<f32>,
    pub padding_ratio: Option<f32>,
    pub font_size: Option<f32>,
    pub text_color: Option<Color>,
    pub align: Option<TextAlign>,
    pub bottom_offset: Option<u32>,
    pub margin: Option<u32>,
    pub corner_radius: Option<u32>,
    pub card_top_padding: Option<u32>,
    pub background: Option<Color>,
    pub quality: Option<u8>,
    pub format: Option<OutputFormat>,
    pub face_selection: Option<FaceSelection>,
    pub multiple_faces: Option<MultiFacePolicy>,
}

impl Overrides {
    pub fn apply(&self, mut config: RenderConfig) -> RenderConfig {
        if self.frame_width.is_some() || self.frame_height.is_some() {
            let width = self.frame_width.unwrap_or(config.frame_width);
            let height = self.frame_height.unwrap_or(config.frame_height);
            config = config.frame(width, height);
        }
        if let Some(factor) = self.box_size_factor {
            config = config.box_size_factor(factor);
        }
        if let Some(ratio) = self.padding_ratio {
            config = config.padding_ratio(ratio);
        }
        if let Some(size) = self.font_size {
            config = config.font_size(size);
        }
        if let Some(color) = self.text_color {
            config = config.text_color(color);
        }
        if let Some(align) = self.align {
            config = config.align(align);
        }
        if let Some(offset) = self.bottom_offset {
            config = config.bottom_offset(offset);
        }
        if let Some(margin) = self.margin {
            config = config.margin(margin);
        }
        if let Some(radius) = self.corner_radius {
            config = config.corner_radius(radius);
        }
        if let Some(top_padding) = self.card_top_padding {
            config = config.layout(FrameLayout::Card { top_padding });
        }
        if let Some(background) = self.background {
            config = config.background(background);
        }
        if let Some(quality) = self.quality {
            config = config.quality(quality);
        }
        if let Some(format) = self.format {
            config = config.format(format);
        }
        if let Some(selection) = self.face_selection {
            config = config.face_selection(selection);
        }
        if let Some(policy) = self.multiple_faces {
            config = config.multiple_faces(policy);
        }
        config
    }
}
