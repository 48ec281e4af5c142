//! Loading captures written by the renderer.

use hdf5_metno::File;
use ndarray::{Array2, Array3};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Capture, CaptureFile};

pub const COLORS_DATASET: &str = "colors";
pub const INSTANCES_DATASET: &str = "instance_segmaps";
pub const CATEGORIES_DATASET: &str = "category_id_segmaps";

/// Anything that can turn a discovered capture file into its arrays
pub trait CaptureSource {
    fn load(&self, file: &CaptureFile) -> Result<Capture>;
}

/// Reads captures from the per-view HDF5 files produced by the renderer
#[derive(Debug, Default, Clone, Copy)]
pub struct Hdf5Source;

impl CaptureSource for Hdf5Source {
    fn load(&self, file: &CaptureFile) -> Result<Capture> {
        read_capture(&file.path)
    }
}

/// Read the color image, instance mask and (if present) category mask of one view
pub fn read_capture(path: &Path) -> Result<Capture> {
    let file = File::open(path)?;

    let colors: Array3<u8> = file.dataset(COLORS_DATASET)?.read()?;
    let instances: Array2<i64> = file.dataset(INSTANCES_DATASET)?.read()?;
    let categories: Option<Array2<i64>> = if file.link_exists(CATEGORIES_DATASET) {
        Some(file.dataset(CATEGORIES_DATASET)?.read()?)
    } else {
        None
    };

    let capture = Capture {
        colors,
        instances,
        categories,
    };
    validate_capture(&capture, path)?;
    Ok(capture)
}

/// Check that channel count and mask dimensions agree with the color image
pub fn validate_capture(capture: &Capture, path: &Path) -> Result<()> {
    let malformed = |reason: String| Error::MalformedCapture {
        path: path.to_path_buf(),
        reason,
    };

    let (height, width, channels) = capture.colors.dim();
    if height == 0 || width == 0 {
        return Err(malformed(format!("empty color image ({}x{})", height, width)));
    }
    if channels != 3 && channels != 4 {
        return Err(malformed(format!(
            "expected 3 or 4 color channels, found {}",
            channels
        )));
    }
    if capture.instances.dim() != (height, width) {
        return Err(malformed(format!(
            "instance mask is {:?}, color image is {:?}",
            capture.instances.dim(),
            (height, width)
        )));
    }
    if let Some(categories) = &capture.categories {
        if categories.dim() != (height, width) {
            return Err(malformed(format!(
                "category mask is {:?}, color image is {:?}",
                categories.dim(),
                (height, width)
            )));
        }
    }

    Ok(())
}
