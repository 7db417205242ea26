//! Command-line argument structures.

use clap::{ArgAction, Parser, ValueEnum};
use defog_core::{DehazeConfig, FilterKind};
use defog_media::{EncoderSettings, VideoCodec};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "defog",
    author,
    version,
    about = "Defog: remove haze from video",
    long_about = "Estimates atmospheric light on the first frame, then dehazes every frame \
                  with a guided-filter refined transmission map."
)]
pub struct Cli {
    /// Hazy input video
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Dehazed output video
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// JSON file with dehazing parameters; flags override its values
    #[arg(long, value_name = "JSON", env = "DEFOG_CONFIG")]
    pub config: Option<PathBuf>,

    // --- Dehazing Overrides ---
    /// Fraction of brightest pixels used for atmospheric light, (0, 1]
    #[arg(long, value_name = "FRACTION")]
    pub top_percentile: Option<f64>,

    /// Lower bound of the transmission map, (0, 1]
    #[arg(long, value_name = "T")]
    pub tmin: Option<f32>,

    /// Haze removal strength, [0, 1]
    #[arg(long)]
    pub omega: Option<f32>,

    /// Guided filter radius in pixels
    #[arg(long, value_name = "PIXELS")]
    pub radius: Option<u32>,

    /// Guided filter regularization
    #[arg(long)]
    pub eps: Option<f32>,

    /// Exponent applied to the refined transmission
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Gain applied to the recovered radiance
    #[arg(long)]
    pub amplification: Option<f32>,

    /// Guide used to refine the transmission map
    #[arg(long, value_enum)]
    pub filter: Option<FilterArg>,

    // --- Encoding ---
    /// Output codec
    #[arg(long, value_enum, default_value_t = CodecArg::H264)]
    pub codec: CodecArg,

    /// Override the codec's constant rate factor
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=63))]
    pub crf: Option<u32>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    Color,
    Gray,
}

impl From<FilterArg> for FilterKind {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Color => FilterKind::Color,
            FilterArg::Gray => FilterKind::Gray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    H264,
    H265,
    Mpeg4,
    Vp9,
}

impl From<CodecArg> for VideoCodec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::H264 => VideoCodec::H264,
            CodecArg::H265 => VideoCodec::H265,
            CodecArg::Mpeg4 => VideoCodec::Mpeg4,
            CodecArg::Vp9 => VideoCodec::Vp9,
        }
    }
}

impl Cli {
    /// Apply flag overrides on top of `base`.
    pub fn apply_overrides(&self, mut base: DehazeConfig) -> DehazeConfig {
        if let Some(v) = self.top_percentile {
            base.top_percentile = v;
        }
        if let Some(v) = self.tmin {
            base.tmin = v;
        }
        if let Some(v) = self.omega {
            base.omega = v;
        }
        if let Some(v) = self.radius {
            base.guided_filter_radius = v;
        }
        if let Some(v) = self.eps {
            base.eps = v;
        }
        if let Some(v) = self.gamma {
            base.gamma = v;
        }
        if let Some(v) = self.amplification {
            base.amplification = v;
        }
        if let Some(v) = self.filter {
            base.filter = v.into();
        }
        base
    }

    /// Encoder preset for the chosen codec.
    pub fn encoder_settings(&self) -> EncoderSettings {
        let settings = EncoderSettings::for_codec(self.codec.into());
        match self.crf {
            Some(crf) => settings.with_crf(crf),
            None => settings,
        }
    }

    /// Conventional extension of the chosen codec, when OUTPUT carries a
    /// different one.
    pub fn extension_mismatch(&self) -> Option<&'static str> {
        let expected = VideoCodec::from(self.codec).extension();
        let actual = self.output.extension().and_then(|ext| ext.to_str());
        match actual {
            Some(ext) if ext.eq_ignore_ascii_case(expected) => None,
            _ => Some(expected),
        }
    }

    /// Default log filter for the verbosity level.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
