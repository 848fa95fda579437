use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::batch::{BatchConfig, DEFAULT_MIN_AREA};
use crate::codec::DEFAULT_JPEG_QUALITY;
use crate::detection::DEFAULT_BACKGROUND_LEVEL;
use crate::geometry::AngleConvention;
use crate::naming::NamingPolicy;

#[derive(Parser, Debug)]
#[command(name = "subphoto-split")]
#[command(version, about = "Split scanned sheets into individual, deskewed photos")]
pub struct Cli {
    /// Folder holding the scans
    #[arg(short, long, default_value = "./scan")]
    pub input: PathBuf,

    /// Folder receiving the cropped photos
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Folder scans are moved to once split
    #[arg(short, long, default_value = "./processed")]
    pub processed: PathBuf,

    /// Leave scans in the input folder instead of moving them
    #[arg(long)]
    pub keep_inputs: bool,

    /// Glob pattern for scans inside the input folder (repeatable)
    #[arg(long = "pattern", default_value = "*.jpeg")]
    pub patterns: Vec<String>,

    /// Minimum region area in pixels² for a region to count as a photo
    #[arg(short = 'a', long, default_value_t = DEFAULT_MIN_AREA, value_parser = parse_area)]
    pub min_area: f64,

    /// Luminance at or above which a pixel counts as scan background
    #[arg(short, long, default_value_t = DEFAULT_BACKGROUND_LEVEL)]
    pub threshold: u8,

    /// How output files are named
    #[arg(long, value_enum, default_value_t = Naming::Unique)]
    pub naming: Naming,

    /// Angle range used when fitting rectangles
    #[arg(long, value_enum, default_value_t = Convention::Legacy)]
    pub angle_convention: Convention,

    /// Do not turn portrait crops into landscape
    #[arg(long)]
    pub no_orient: bool,

    /// JPEG quality of the written photos (1-100)
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub quality: u8,

    /// Show detection details
    #[arg(long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// <scan>_<timestamp>_<uuid>.jpg
    Unique,
    /// <scan>_<index>.jpg
    Sequential,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// [-90, 0)
    Legacy,
    /// (0, 90]
    Modern,
}

impl From<Naming> for NamingPolicy {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::Unique => NamingPolicy::Unique,
            Naming::Sequential => NamingPolicy::Sequential,
        }
    }
}

impl From<Convention> for AngleConvention {
    fn from(convention: Convention) -> Self {
        match convention {
            Convention::Legacy => AngleConvention::Legacy,
            Convention::Modern => AngleConvention::Modern,
        }
    }
}

impl Cli {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            processed_dir: (!self.keep_inputs).then(|| self.processed.clone()),
            patterns: self.patterns.clone(),
            min_area: self.min_area,
            naming: self.naming.into(),
        }
    }
}

fn parse_area(s: &str) -> Result<f64, String> {
    let area: f64 = s
        .parse()
        .map_err(|_| format!("Invalid area value: {}", s))?;

    if !area.is_finite() || area <= 0.0 {
        return Err("Area must be a positive number".to_string());
    }

    Ok(area)
}
