//! Rendered HDF5 capture to YOLO dataset converter
//!
//! This library turns per-view captures (color image, instance mask and
//! category mask) into YOLO bounding-box labels with a seeded train/val split.

pub mod capture;
pub mod classes;
pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod io;
pub mod mask;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use capture::{CaptureSource, Hdf5Source};
pub use classes::{ClassEntry, ClassMap};
pub use config::{Args, ImageFormat, RegionPolicy};
pub use dataset::{process_dataset, split_captures};
pub use error::{Error, Result};
pub use io::{create_dataset_yaml, discover_captures, setup_output_directories};
pub use types::{Capture, CaptureFile, DatasetReport, PixelBox, SplitData, YoloBox, YoloLabel};
