use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

use crate::capture::CaptureSource;
use crate::classes::ClassMap;
use crate::config::Args;
use crate::conversion::{convert_capture, write_image, write_labels, ConvertOptions};
use crate::error::{Error, Result};
use crate::io::{create_dataset_yaml, setup_output_directories, MANIFEST_FILE};
use crate::types::{
    CaptureFailure, CaptureFile, ConvertedCapture, DatasetReport, OutputDirs, Partition, SplitData,
};
use crate::utils::create_progress_bar;

/// Split the captures into training and validation sets.
///
/// The captures are sorted by name, shuffled with `seed`, and the first
/// `floor(train_ratio * n)` of them become the training set.
pub fn split_captures(mut captures: Vec<CaptureFile>, train_ratio: f64, seed: u64) -> SplitData {
    captures.sort_by_cached_key(CaptureFile::name);
    let mut rng = StdRng::seed_from_u64(seed);
    captures.shuffle(&mut rng);

    let train_size = ((captures.len() as f64 * train_ratio).floor() as usize).min(captures.len());
    let val = captures.split_off(train_size);

    SplitData {
        train: captures,
        val,
    }
}

/// Main dataset processing pipeline.
///
/// Fails before touching the output directory when `captures` is empty. A
/// capture that cannot be converted is logged and reported in the returned
/// [`DatasetReport`] while the remaining captures are still processed.
pub fn process_dataset<S: CaptureSource>(
    captures: Vec<CaptureFile>,
    source: &S,
    class_map: &ClassMap,
    args: &Args,
) -> Result<DatasetReport> {
    let input_dir = Path::new(&args.input_dir);
    if captures.is_empty() {
        return Err(Error::NoCaptures {
            dir: input_dir.to_path_buf(),
            pattern: args.pattern.clone(),
        });
    }

    info!("Found {} capture files.", captures.len());
    info!("Output directory: {}", args.output_dir);
    info!(
        "Train/Val ratio: {:.0}% / {:.0}%",
        args.train_ratio * 100.0,
        (1.0 - args.train_ratio) * 100.0
    );

    let split_data = split_captures(captures, args.train_ratio, args.seed);
    let output_dirs = setup_output_directories(Path::new(&args.output_dir))?;
    let options = ConvertOptions {
        region_policy: args.region_policy,
        require_category_mask: args.require_category_mask,
    };

    let mut report = DatasetReport::default();
    for (partition, files) in [
        (Partition::Train, split_data.train),
        (Partition::Val, split_data.val),
    ] {
        process_partition(
            partition,
            files,
            source,
            class_map,
            &options,
            args,
            &output_dirs,
            &mut report,
        );
    }

    fs::remove_dir_all(&output_dirs.staging_dir)?;

    info!("Creating {} file...", MANIFEST_FILE);
    create_dataset_yaml(&output_dirs.root, class_map)?;

    report.stats.print_summary();
    if report.is_complete() {
        info!("Conversion process completed successfully.");
    } else {
        warn!(
            "Conversion finished with {} failed captures:",
            report.failures.len()
        );
        for failure in &report.failures {
            warn!("  {}: {}", failure.name, failure.reason);
        }
    }

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn process_partition<S: CaptureSource>(
    partition: Partition,
    mut files: Vec<CaptureFile>,
    source: &S,
    class_map: &ClassMap,
    options: &ConvertOptions,
    args: &Args,
    output_dirs: &OutputDirs,
    report: &mut DatasetReport,
) {
    files.sort_by_cached_key(CaptureFile::name);
    info!(
        "Converting {} {} captures...",
        files.len(),
        partition.dir_name()
    );
    let pb = create_progress_bar(files.len() as u64, partition.tag());

    for file in &files {
        match process_capture(file, partition, source, class_map, options, args, output_dirs) {
            Ok(converted) => {
                info!(
                    "[{}] {}: {} objects",
                    partition.tag(),
                    file.name(),
                    converted.labels.len()
                );
                report.stats.record_capture(partition, &converted);
            }
            Err(e) => {
                error!("Failed to convert {}: {}", file.name(), e);
                discard_outputs(file, partition, args, output_dirs);
                report.stats.increment_failed();
                report.failures.push(CaptureFailure {
                    name: file.name(),
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!("{} processing complete", partition.dir_name()));
}

/// Convert one capture into the staging dir, then move the results into the
/// partition's directories.
pub fn process_capture<S: CaptureSource>(
    file: &CaptureFile,
    partition: Partition,
    source: &S,
    class_map: &ClassMap,
    options: &ConvertOptions,
    args: &Args,
    output_dirs: &OutputDirs,
) -> Result<ConvertedCapture> {
    let capture = source.load(file)?;
    let converted = convert_capture(&capture, class_map, options, &file.path)?;

    let stem = file.output_stem();
    let image_name = format!("{}.{}", stem, args.image_format.extension());
    let label_name = format!("{}.txt", stem);
    let staged_image = output_dirs.staging_images_dir.join(&image_name);
    let staged_label = output_dirs.staging_labels_dir.join(&label_name);

    write_image(&capture, &staged_image)?;
    write_labels(&converted.labels, &staged_label)?;

    fs::rename(
        &staged_image,
        output_dirs.images_dir(partition).join(&image_name),
    )?;
    fs::rename(
        &staged_label,
        output_dirs.labels_dir(partition).join(&label_name),
    )?;

    Ok(converted)
}

// Remove whatever a failed capture left behind, staged or already moved
fn discard_outputs(file: &CaptureFile, partition: Partition, args: &Args, output_dirs: &OutputDirs) {
    let stem = file.output_stem();
    let image_name = format!("{}.{}", stem, args.image_format.extension());
    let label_name = format!("{}.txt", stem);

    for leftover in [
        output_dirs.staging_images_dir.join(&image_name),
        output_dirs.staging_labels_dir.join(&label_name),
        output_dirs.images_dir(partition).join(&image_name),
        output_dirs.labels_dir(partition).join(&label_name),
    ] {
        if leftover.exists() {
            if let Err(e) = fs::remove_file(&leftover) {
                warn!("Failed to remove {:?}: {}", leftover, e);
            }
        }
    }
}
