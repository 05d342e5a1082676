use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use log::info;

use crop_rows::render::draw_row_bands;
use crop_rows::{BinaryMask, Cli, CropRowDetector, DetectOptions, Detection};

const MASK_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "info" },
    ))
    .init();

    let detector = CropRowDetector::new(cli.detector_config())
        .context("Invalid detector configuration")?;

    let inputs = collect_inputs(&cli.input)?;
    if inputs.is_empty() {
        anyhow::bail!("No mask images found under {:?}", cli.input);
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", cli.out_dir))?;

    for path in &inputs {
        process_mask(path, &detector, &cli)
            .with_context(|| format!("Failed to process {path:?}"))?;
    }

    eprintln!("Processed {} mask(s) into {:?}", inputs.len(), cli.out_dir);
    Ok(())
}

/// A single mask file, or every mask image directly inside a directory.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(input)
        .with_context(|| format!("Failed to read input directory {input:?}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| MASK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn process_mask(path: &Path, detector: &CropRowDetector, cli: &Cli) -> Result<()> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open input file: {path:?}"))?
        .decode()
        .with_context(|| format!("Failed to decode image: {path:?}"))?;
    let mask = BinaryMask::from_image(img).context("Input is not a single-channel mask")?;
    let (width, height) = (mask.width(), mask.height());

    let options = DetectOptions {
        return_crop_mask: !cli.no_masks,
        ..DetectOptions::default()
    };
    let detection = detector.detect(&mask, &options);

    info!(
        "{:?}: {} rows, mean crop size {:?}",
        path.file_name().unwrap_or_default(),
        detection.lines.len(),
        detection.mean_crop_size
    );

    let stem = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let csv_path = cli.out_dir.join(format!("{stem}_mask.csv"));
    write_lines_csv(&csv_path, &detection)
        .with_context(|| format!("Failed to write {csv_path:?}"))?;

    if !cli.no_masks {
        let band_half_width = detection.mean_crop_size.unwrap_or(1.0);
        let row_mask = draw_row_bands(width, height, &detection.lines, band_half_width);
        let mask_path = cli.out_dir.join(format!("{stem}_mask.png"));
        row_mask
            .save(&mask_path)
            .with_context(|| format!("Failed to save {mask_path:?}"))?;

        if let Some(crop_mask) = &detection.crop_mask {
            let crop_path = cli.out_dir.join(format!("{stem}_cropmask.png"));
            crop_mask
                .save(&crop_path)
                .with_context(|| format!("Failed to save {crop_path:?}"))?;
        }
    }

    Ok(())
}

fn write_lines_csv(path: &Path, detection: &Detection) -> Result<()> {
    let mut file = fs::File::create(path)?;
    writeln!(file, "theta,rho")?;
    for line in &detection.lines {
        writeln!(file, "{},{}", line.theta_deg, line.rho)?;
    }
    Ok(())
}
