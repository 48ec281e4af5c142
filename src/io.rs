use glob::glob;
use log::warn;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::classes::ClassMap;
use crate::error::{Error, Result};
use crate::types::{CaptureFile, OutputDirs};
use crate::utils::{create_output_directory, has_hdf5_extension};

pub const MANIFEST_FILE: &str = "data.yaml";
pub const STAGING_DIR: &str = ".staging";

/// Find capture files under `input_dir` matching `pattern`.
///
/// The scene is the name of the file's parent folder and the view is the
/// file stem. Results are sorted by name. Two files that would export under
/// the same base name are rejected.
pub fn discover_captures(input_dir: &Path, pattern: &str) -> Result<Vec<CaptureFile>> {
    let full_pattern = format!("{}/{}", input_dir.display(), pattern);
    let mut captures = Vec::new();

    for entry in glob(&full_pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to read {:?}: {}", e.path(), e.error());
                continue;
            }
        };
        if !path.is_file() || !has_hdf5_extension(&path) {
            continue;
        }

        let scene = path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        let view = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());

        match (scene, view) {
            (Some(scene), Some(view)) => captures.push(CaptureFile::new(scene, view, path)),
            _ => warn!("Cannot derive a capture name from {:?}; skipping", path),
        }
    }

    captures.sort_by_cached_key(CaptureFile::name);

    let mut stems: HashMap<String, &CaptureFile> = HashMap::with_capacity(captures.len());
    for capture in &captures {
        if let Some(first) = stems.insert(capture.output_stem(), capture) {
            return Err(Error::DuplicateCapture {
                stem: capture.output_stem(),
                first: first.path.clone(),
                second: capture.path.clone(),
            });
        }
    }

    Ok(captures)
}

/// Set up the directory structure for YOLO dataset output
pub fn setup_output_directories(root: &Path) -> std::io::Result<OutputDirs> {
    let labels_dir = create_output_directory(&root.join("labels"))?;
    let images_dir = create_output_directory(&root.join("images"))?;

    let train_labels_dir = create_output_directory(&labels_dir.join("train"))?;
    let val_labels_dir = create_output_directory(&labels_dir.join("val"))?;
    let train_images_dir = create_output_directory(&images_dir.join("train"))?;
    let val_images_dir = create_output_directory(&images_dir.join("val"))?;

    // A leftover staging dir means an earlier run crashed mid-capture
    let staging_dir = create_output_directory(&root.join(STAGING_DIR))?;
    let staging_labels_dir = create_output_directory(&staging_dir.join("labels"))?;
    let staging_images_dir = create_output_directory(&staging_dir.join("images"))?;

    Ok(OutputDirs {
        root: root.to_path_buf(),
        train_labels_dir,
        val_labels_dir,
        train_images_dir,
        val_images_dir,
        staging_labels_dir,
        staging_images_dir,
        staging_dir,
    })
}

/// Create the data.yaml manifest for YOLO training
pub fn create_dataset_yaml(root: &Path, class_map: &ClassMap) -> std::io::Result<()> {
    let dataset_yaml_path = root.join(MANIFEST_FILE);
    let mut dataset_yaml = BufWriter::new(File::create(&dataset_yaml_path)?);
    let absolute_path = fs::canonicalize(root)?;

    let mut yaml_content = format!(
        "path: {}\ntrain: images/train\nval: images/val\n",
        yaml_single_quoted(&absolute_path.to_string_lossy())
    );
    yaml_content.push_str(&format!("\nnc: {}\nnames:\n", class_map.len()));
    for (id, name) in class_map.names().enumerate() {
        yaml_content.push_str(&format!("    {}: {}\n", id, yaml_single_quoted(name)));
    }

    dataset_yaml.write_all(yaml_content.as_bytes())?;
    dataset_yaml.flush()
}

// Single-quoted scalars only need embedded quotes doubled
fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}
