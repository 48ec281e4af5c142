use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hdf52yolo::{discover_captures, process_dataset, Args, ClassMap, Hdf5Source};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let dirname = PathBuf::from(&args.input_dir);
    if !dirname.exists() {
        error!("The specified input_dir does not exist: {}", args.input_dir);
        return ExitCode::FAILURE;
    }

    let class_map = match &args.class_map {
        Some(path) => match ClassMap::from_json_file(Path::new(path)) {
            Ok(class_map) => class_map,
            Err(e) => {
                error!("Failed to load class map {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => ClassMap::default(),
    };

    info!("Starting HDF5 to YOLO conversion...");

    let captures = match discover_captures(&dirname, &args.pattern) {
        Ok(captures) => captures,
        Err(e) => {
            error!("Failed to search for captures: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match process_dataset(captures, &Hdf5Source, &class_map, &args) {
        Ok(report) if report.is_complete() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
