use ndarray::{Array2, Array3};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hdf52yolo::{
    discover_captures, process_dataset, split_captures, Args, Capture, CaptureFile,
    CaptureSource, ClassMap, Error, ImageFormat, RegionPolicy, Result,
};

/// Serves captures from memory; unknown paths fail like an unreadable file
struct MemorySource {
    captures: HashMap<PathBuf, Capture>,
}

impl CaptureSource for MemorySource {
    fn load(&self, file: &CaptureFile) -> Result<Capture> {
        self.captures
            .get(&file.path)
            .cloned()
            .ok_or_else(|| Error::MalformedCapture {
                path: file.path.clone(),
                reason: "unreadable".to_string(),
            })
    }
}

/// Serves the same capture for every file and remembers the load order
struct RecordingSource {
    loaded: RefCell<Vec<String>>,
}

impl CaptureSource for RecordingSource {
    fn load(&self, file: &CaptureFile) -> Result<Capture> {
        self.loaded.borrow_mut().push(file.name());
        Ok(sample_capture(false))
    }
}

fn test_args(input_dir: &Path, output_dir: &Path) -> Args {
    Args {
        input_dir: input_dir.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        train_ratio: 0.8,
        seed: 42,
        pattern: "scene_*/[0-9]*.hdf5".to_string(),
        class_map: None,
        region_policy: RegionPolicy::Largest,
        image_format: ImageFormat::Png,
        require_category_mask: false,
    }
}

// 16x16 capture with one banana (category 2) and, optionally, one unlisted object
fn sample_capture(with_clutter: bool) -> Capture {
    let mut instances = Array2::zeros((16, 16));
    let mut categories = Array2::zeros((16, 16));
    for y in 4..8 {
        for x in 2..10 {
            instances[[y, x]] = 1;
            categories[[y, x]] = 2;
        }
    }
    if with_clutter {
        for y in 10..14 {
            for x in 10..14 {
                instances[[y, x]] = 2;
                categories[[y, x]] = 9;
            }
        }
    }
    Capture {
        colors: Array3::from_elem((16, 16, 3), 128),
        instances,
        categories: Some(categories),
    }
}

fn capture_file(scene: usize, view: usize) -> CaptureFile {
    CaptureFile::new(
        format!("scene_{:04}", scene),
        view.to_string(),
        PathBuf::from(format!("scene_{:04}/{}.hdf5", scene, view)),
    )
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_process_dataset_writes_partitions_and_manifest() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let args = test_args(temp_dir.path(), &output_dir);

    let files: Vec<_> = (0..5).map(|scene| capture_file(scene, 0)).collect();
    let source = MemorySource {
        captures: files
            .iter()
            .enumerate()
            .map(|(i, file)| (file.path.clone(), sample_capture(i % 2 == 0)))
            .collect(),
    };

    let report = process_dataset(files, &source, &ClassMap::default(), &args).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.stats.train_images, 4);
    assert_eq!(report.stats.val_images, 1);
    assert_eq!(report.stats.total_objects, 5);
    assert_eq!(report.stats.skipped_instances, 3);

    assert_eq!(count_files(&output_dir.join("images/train")), 4);
    assert_eq!(count_files(&output_dir.join("labels/train")), 4);
    assert_eq!(count_files(&output_dir.join("images/val")), 1);
    assert_eq!(count_files(&output_dir.join("labels/val")), 1);
    assert!(!output_dir.join(".staging").exists());

    let label_path = ["train", "val"]
        .iter()
        .map(|split| output_dir.join("labels").join(split).join("scene_0000_cam0.txt"))
        .find(|path| path.exists())
        .unwrap();
    assert_eq!(
        fs::read_to_string(label_path).unwrap(),
        "1 0.375000 0.375000 0.500000 0.250000\n"
    );

    let image_path = ["train", "val"]
        .iter()
        .map(|split| output_dir.join("images").join(split).join("scene_0000_cam0.png"))
        .find(|path| path.exists())
        .unwrap();
    let image = image::open(image_path).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(image.get_pixel(3, 3).0, [128, 128, 128]);

    let yaml_content = fs::read_to_string(output_dir.join("data.yaml")).unwrap();
    assert!(yaml_content.contains("train: images/train"));
    assert!(yaml_content.contains("nc: 4"));
    assert!(yaml_content.contains("1: 'banana'"));
}

#[test]
fn test_failed_capture_does_not_abort_batch() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let args = test_args(temp_dir.path(), &output_dir);

    let files: Vec<_> = (0..4).map(|view| capture_file(1, view)).collect();
    let source = MemorySource {
        captures: files
            .iter()
            .filter(|file| file.view != "2")
            .map(|file| (file.path.clone(), sample_capture(false)))
            .collect(),
    };

    let report = process_dataset(files, &source, &ClassMap::default(), &args).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "scene_0001/cam2");
    assert_eq!(report.stats.failed_captures, 1);
    assert_eq!(report.stats.total_images(), 3);

    let images = count_files(&output_dir.join("images/train"))
        + count_files(&output_dir.join("images/val"));
    let labels = count_files(&output_dir.join("labels/train"))
        + count_files(&output_dir.join("labels/val"));
    assert_eq!(images, 3);
    assert_eq!(labels, 3);
    assert!(!output_dir.join(".staging").exists());
    assert!(output_dir.join("data.yaml").exists());
}

#[test]
fn test_empty_capture_still_counts_as_image() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let mut args = test_args(temp_dir.path(), &output_dir);
    args.train_ratio = 1.0;

    let file = capture_file(0, 0);
    let source = MemorySource {
        captures: HashMap::from([(
            file.path.clone(),
            Capture {
                colors: Array3::zeros((8, 8, 3)),
                instances: Array2::zeros((8, 8)),
                categories: Some(Array2::zeros((8, 8))),
            },
        )]),
    };

    let report = process_dataset(vec![file], &source, &ClassMap::default(), &args).unwrap();

    assert_eq!(report.stats.train_images, 1);
    assert_eq!(report.stats.total_objects, 0);
    let label = fs::read_to_string(output_dir.join("labels/train/scene_0000_cam0.txt")).unwrap();
    assert!(label.is_empty());
}

#[test]
fn test_no_captures_aborts_without_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let args = test_args(temp_dir.path(), &output_dir);
    let source = MemorySource {
        captures: HashMap::new(),
    };

    let result = process_dataset(Vec::new(), &source, &ClassMap::default(), &args);

    assert!(matches!(result, Err(Error::NoCaptures { .. })));
    assert!(!output_dir.exists());
}

#[test]
fn test_jpeg_output_drops_alpha() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let mut args = test_args(temp_dir.path(), &output_dir);
    args.train_ratio = 0.0;
    args.image_format = ImageFormat::Jpg;

    let file = capture_file(2, 1);
    let mut capture = sample_capture(false);
    capture.colors = Array3::from_elem((16, 16, 4), 200);
    let source = MemorySource {
        captures: HashMap::from([(file.path.clone(), capture)]),
    };

    let report = process_dataset(vec![file], &source, &ClassMap::default(), &args).unwrap();

    assert_eq!(report.stats.val_images, 1);
    let image = image::open(output_dir.join("images/val/scene_0002_cam1.jpg")).unwrap();
    assert_eq!((image.width(), image.height()), (16, 16));
}

#[test]
fn test_discover_captures() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    for relative in [
        "scene_0002/0.hdf5",
        "scene_0001/1.hdf5",
        "scene_0001/0.hdf5",
        "scene_0001/notes.txt",
        "scene_0001/meta.hdf5",
        "other/0.hdf5",
    ] {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    let captures = discover_captures(root, "scene_*/[0-9]*.hdf5").unwrap();
    let names: Vec<_> = captures.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["scene_0001/cam0", "scene_0001/cam1", "scene_0002/cam0"]
    );
    assert_eq!(captures[0].path, root.join("scene_0001/0.hdf5"));
}

#[test]
fn test_rerun_replaces_previous_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let args = test_args(temp_dir.path(), &output_dir);

    let stale = output_dir.join("images/train/stale.png");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"old").unwrap();

    let file = capture_file(0, 0);
    let source = MemorySource {
        captures: HashMap::from([(file.path.clone(), sample_capture(false))]),
    };
    process_dataset(vec![file], &source, &ClassMap::default(), &args).unwrap();

    assert!(!stale.exists());
}

#[test]
fn test_partitions_are_processed_in_name_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let mut args = test_args(temp_dir.path(), &output_dir);
    args.train_ratio = 0.5;

    // "scene_1-b" sorts before "scene_1" by name but after it by scene field
    let mut files = Vec::new();
    for scene in ["scene_2", "scene_1-b", "scene_10", "scene_1"] {
        for view in ["1", "0", "2"] {
            files.push(CaptureFile::new(
                scene,
                view,
                format!("{}/{}.hdf5", scene, view),
            ));
        }
    }
    let expected = split_captures(files.clone(), args.train_ratio, args.seed);

    let source = RecordingSource {
        loaded: RefCell::new(Vec::new()),
    };
    let report = process_dataset(files, &source, &ClassMap::default(), &args).unwrap();
    assert!(report.is_complete());

    let loaded = source.loaded.into_inner();
    assert_eq!(loaded.len(), 12);
    let (train, val) = loaded.split_at(expected.train.len());

    let mut train_names: Vec<_> = expected.train.iter().map(CaptureFile::name).collect();
    train_names.sort();
    let mut val_names: Vec<_> = expected.val.iter().map(CaptureFile::name).collect();
    val_names.sort();
    assert_eq!(train, train_names.as_slice());
    assert_eq!(val, val_names.as_slice());
}

#[test]
fn test_png_output_keeps_alpha() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output_dir = temp_dir.path().join("yolo");
    let mut args = test_args(temp_dir.path(), &output_dir);
    args.train_ratio = 1.0;

    let file = capture_file(3, 0);
    let mut capture = sample_capture(false);
    capture.colors = Array3::from_shape_fn((16, 16, 4), |(_, _, c)| if c == 3 { 64 } else { 10 });
    let source = MemorySource {
        captures: HashMap::from([(file.path.clone(), capture)]),
    };

    process_dataset(vec![file], &source, &ClassMap::default(), &args).unwrap();

    let image = image::open(output_dir.join("images/train/scene_0003_cam0.png")).unwrap();
    assert!(image.color().has_alpha());
    assert_eq!(image.to_rgba8().get_pixel(0, 0).0, [10, 10, 10, 64]);
}

#[test]
fn test_discover_rejects_colliding_output_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    for relative in ["scene_0001/0.hdf5", "scene_0001/0.h5"] {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    let result = discover_captures(root, "scene_*/0.*");
    assert!(matches!(result, Err(Error::DuplicateCapture { .. })));

    let captures = discover_captures(root, "scene_*/0.hdf5").unwrap();
    assert_eq!(captures.len(), 1);
}
