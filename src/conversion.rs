use image::{DynamicImage, RgbImage, RgbaImage};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::capture::validate_capture;
use crate::classes::ClassMap;
use crate::config::RegionPolicy;
use crate::error::{Error, Result};
use crate::mask::{extract_bbox, median_category};
use crate::types::{Capture, ConvertedCapture, YoloLabel};

/// Knobs for turning one capture into labels
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub region_policy: RegionPolicy,
    pub require_category_mask: bool,
}

/// Derive one YOLO label per recognised instance of `capture`.
///
/// Instances are visited in ascending id order. An instance is skipped when
/// its category has no class or its mask yields no box. Captures whose masks
/// do not match the color image are rejected.
pub fn convert_capture(
    capture: &Capture,
    class_map: &ClassMap,
    options: &ConvertOptions,
    path: &Path,
) -> Result<ConvertedCapture> {
    validate_capture(capture, path)?;

    if capture.categories.is_none() {
        if options.require_category_mask {
            return Err(Error::MalformedCapture {
                path: path.to_path_buf(),
                reason: "no category mask".to_string(),
            });
        }
        warn!(
            "No category mask in {:?}; using instance ids as category ids",
            path
        );
    }

    let (width, height) = (capture.width(), capture.height());
    let instance_ids: BTreeSet<i64> = capture
        .instances
        .iter()
        .copied()
        .filter(|&id| id > 0)
        .collect();

    let mut converted = ConvertedCapture {
        labels: Vec::with_capacity(instance_ids.len()),
        skipped_instances: 0,
    };

    for instance_id in instance_ids {
        let mask = capture.instances.mapv(|id| id == instance_id);

        let category_id = match &capture.categories {
            Some(categories) => match median_category(categories.view(), mask.view()) {
                Some(category_id) => category_id,
                None => {
                    converted.skipped_instances += 1;
                    continue;
                }
            },
            None => instance_id,
        };

        let Some(class_id) = class_map.class_id(category_id) else {
            debug!(
                "Instance {} has unmapped category {}; skipping",
                instance_id, category_id
            );
            converted.skipped_instances += 1;
            continue;
        };

        let Some(bbox) = extract_bbox(mask.view(), options.region_policy) else {
            converted.skipped_instances += 1;
            continue;
        };

        converted.labels.push(YoloLabel {
            class_id,
            bbox: bbox.normalize(width, height),
        });
    }

    Ok(converted)
}

/// Render labels in YOLO text form, one line per label
pub fn format_labels(labels: &[YoloLabel]) -> String {
    let mut yolo_data = String::with_capacity(labels.len() * 48);
    for label in labels {
        yolo_data.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            label.class_id,
            label.bbox.x_center,
            label.bbox.y_center,
            label.bbox.width,
            label.bbox.height
        ));
    }
    yolo_data
}

pub fn write_labels(labels: &[YoloLabel], path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_labels(labels).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Save the color image of `capture`; the format follows the file extension.
///
/// RGBA captures keep their alpha channel except when written as JPEG.
pub fn write_image(capture: &Capture, path: &Path) -> Result<()> {
    let (height, width, channels) = capture.colors.dim();
    let (w, h) = (width as u32, height as u32);
    let pixels: Vec<u8> = capture.colors.iter().copied().collect();
    let malformed = || Error::MalformedCapture {
        path: path.to_path_buf(),
        reason: format!("color buffer does not fit {}x{}x{}", height, width, channels),
    };

    let image = match channels {
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, pixels).ok_or_else(malformed)?),
        4 => {
            let rgba = DynamicImage::ImageRgba8(
                RgbaImage::from_raw(w, h, pixels).ok_or_else(malformed)?,
            );
            if is_jpeg_path(path) {
                DynamicImage::ImageRgb8(rgba.to_rgb8())
            } else {
                rgba
            }
        }
        _ => return Err(malformed()),
    };

    image.save(path)?;
    Ok(())
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false)
}
