use ndarray::{Array2, Array3};
use std::path::PathBuf;

// One capture file on disk, identified by its scene folder and view index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureFile {
    pub scene: String,
    pub view: String,
    pub path: PathBuf,
}

impl CaptureFile {
    pub fn new(scene: impl Into<String>, view: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            scene: scene.into(),
            view: view.into(),
            path: path.into(),
        }
    }

    /// Identifying name used for ordering and logging, e.g. `scene_0001/cam0`
    pub fn name(&self) -> String {
        format!("{}/cam{}", self.scene, self.view)
    }

    /// Base name shared by the exported image and label file
    pub fn output_stem(&self) -> String {
        sanitize_filename::sanitize(format!("{}_cam{}", self.scene, self.view))
    }
}

/// The arrays of one rendered camera view.
///
/// `colors` is `H x W x C` with `C` either 3 (RGB) or 4 (RGBA). Both masks are
/// `H x W`; instance id 0 marks background.
#[derive(Debug, Clone)]
pub struct Capture {
    pub colors: Array3<u8>,
    pub instances: Array2<i64>,
    pub categories: Option<Array2<i64>>,
}

impl Capture {
    pub fn height(&self) -> usize {
        self.colors.shape()[0]
    }

    pub fn width(&self) -> usize {
        self.colors.shape()[1]
    }
}

/// Axis-aligned box in pixel coordinates. `x_max`/`y_max` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x_min: usize,
    pub y_min: usize,
    pub x_max: usize,
    pub y_max: usize,
}

impl PixelBox {
    /// Box covering the single pixel at (x, y)
    pub fn from_pixel(x: usize, y: usize) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x + 1,
            y_max: y + 1,
        }
    }

    pub fn width(&self) -> usize {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> usize {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn include(&mut self, x: usize, y: usize) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x + 1);
        self.y_max = self.y_max.max(y + 1);
    }

    pub fn union(&self, other: &PixelBox) -> PixelBox {
        PixelBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Convert to YOLO center/size form, scaled by the image dimensions.
    ///
    /// Callers must pass a positive width and height.
    pub fn normalize(&self, image_width: usize, image_height: usize) -> YoloBox {
        let (w, h) = (image_width as f64, image_height as f64);
        YoloBox {
            x_center: (self.x_min + self.x_max) as f64 / 2.0 / w,
            y_center: (self.y_min + self.y_max) as f64 / 2.0 / h,
            width: self.width() as f64 / w,
            height: self.height() as f64 / h,
        }
    }
}

/// Bounding box in YOLO form: center and size relative to the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloBox {
    /// Map back to pixel coordinates, rounding every edge to the nearest pixel
    pub fn denormalize(&self, image_width: usize, image_height: usize) -> PixelBox {
        let (w, h) = (image_width as f64, image_height as f64);
        let half_w = self.width * w / 2.0;
        let half_h = self.height * h / 2.0;
        let edge = |v: f64| v.round().max(0.0) as usize;
        PixelBox {
            x_min: edge(self.x_center * w - half_w),
            y_min: edge(self.y_center * h - half_h),
            x_max: edge(self.x_center * w + half_w),
            y_max: edge(self.y_center * h + half_h),
        }
    }

    pub fn is_normalized(&self) -> bool {
        [self.x_center, self.y_center, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// One line of a YOLO label file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloLabel {
    pub class_id: usize,
    pub bbox: YoloBox,
}

/// Result of converting one capture
#[derive(Debug, Clone, Default)]
pub struct ConvertedCapture {
    pub labels: Vec<YoloLabel>,
    /// Instances dropped because their category is unmapped or their mask is empty
    pub skipped_instances: usize,
}

// Struct to hold the paths to the output directories for train/val splits
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub train_labels_dir: PathBuf,
    pub val_labels_dir: PathBuf,
    pub train_images_dir: PathBuf,
    pub val_images_dir: PathBuf,
    pub staging_labels_dir: PathBuf,
    pub staging_images_dir: PathBuf,
    pub staging_dir: PathBuf,
}

impl OutputDirs {
    pub fn images_dir(&self, partition: Partition) -> &PathBuf {
        match partition {
            Partition::Train => &self.train_images_dir,
            Partition::Val => &self.val_images_dir,
        }
    }

    pub fn labels_dir(&self, partition: Partition) -> &PathBuf {
        match partition {
            Partition::Train => &self.train_labels_dir,
            Partition::Val => &self.val_labels_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Val,
}

impl Partition {
    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Val => "val",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Partition::Train => "TRAIN",
            Partition::Val => "VAL",
        }
    }
}

// Struct to hold the split captures for training and validation
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    pub train: Vec<CaptureFile>,
    pub val: Vec<CaptureFile>,
}

/// A capture that could not be converted
#[derive(Debug, Clone)]
pub struct CaptureFailure {
    pub name: String,
    pub path: PathBuf,
    pub reason: String,
}

// Struct to hold processing statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub train_images: usize,
    pub val_images: usize,
    pub total_objects: usize,
    pub skipped_instances: usize,
    pub failed_captures: usize,
}

impl ProcessingStats {
    pub fn total_images(&self) -> usize {
        self.train_images + self.val_images
    }

    pub fn record_capture(&mut self, partition: Partition, converted: &ConvertedCapture) {
        match partition {
            Partition::Train => self.train_images += 1,
            Partition::Val => self.val_images += 1,
        }
        self.total_objects += converted.labels.len();
        self.skipped_instances += converted.skipped_instances;
    }

    pub fn increment_failed(&mut self) {
        self.failed_captures += 1;
    }

    pub fn print_summary(&self) {
        let total = self.total_images();
        let percent = |n: usize| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64 * 100.0
            }
        };

        log::info!("=== Conversion Summary ===");
        log::info!("Total images: {}", total);
        log::info!(
            "  - Train: {} ({:.1}%)",
            self.train_images,
            percent(self.train_images)
        );
        log::info!(
            "  - Val: {} ({:.1}%)",
            self.val_images,
            percent(self.val_images)
        );
        log::info!("Total objects: {}", self.total_objects);
        if total > 0 {
            log::info!(
                "Average objects per image: {:.1}",
                self.total_objects as f64 / total as f64
            );
        }
        log::info!(
            "Skipped instances (unmapped category or empty mask): {}",
            self.skipped_instances
        );

        if self.failed_captures > 0 {
            log::warn!("Failed captures: {}", self.failed_captures);
        }
    }
}

/// Outcome of a whole conversion run
#[derive(Debug, Clone, Default)]
pub struct DatasetReport {
    pub stats: ProcessingStats,
    pub failures: Vec<CaptureFailure>,
}

impl DatasetReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
