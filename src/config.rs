use clap::{Parser, ValueEnum};
use std::str::FromStr;

/// Command-line arguments for converting rendered HDF5 captures to a YOLO dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing the per-scene capture folders
    #[arg(short = 'i', long = "input_dir", default_value = "dataset/raw")]
    pub input_dir: String,

    /// Directory the YOLO dataset is written to
    #[arg(short = 'o', long = "output_dir", default_value = "dataset/yolo")]
    pub output_dir: String,

    /// Proportion of the captures to use for training
    #[arg(long = "train_ratio", default_value_t = 0.8, value_parser = validate_size)]
    pub train_ratio: f64,

    /// Seed for random shuffling
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Glob pattern, relative to input_dir, selecting capture files
    #[arg(long = "pattern", default_value = "scene_*/[0-9]*.hdf5")]
    pub pattern: String,

    /// JSON file with the ordered list of {"category_id", "name"} classes
    #[arg(long = "class_map")]
    pub class_map: Option<String>,

    /// Which mask regions an instance's bounding box encloses
    #[arg(long = "region_policy", value_enum, default_value = "largest")]
    pub region_policy: RegionPolicy,

    /// File format of the exported images
    #[arg(long = "image_format", visible_alias = "format", value_enum, default_value = "png")]
    pub image_format: ImageFormat,

    /// Reject captures without a category mask instead of using instance ids as categories
    #[arg(long = "require_category_mask")]
    pub require_category_mask: bool,
}

/// Policy for instances whose mask splits into several disjoint regions
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum RegionPolicy {
    /// Box around the largest connected region only
    #[default]
    Largest,
    /// Box around all regions of the instance
    Union,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

// Validate that the size is between 0.0 and 1.0
pub fn validate_size(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}
