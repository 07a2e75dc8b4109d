//! Detect Landolt-C markers in one image and print them.
//!
//! Usage: `cargo run --example detect_image -- <image> [reference]`.
//! Without a reference image the built-in template is used.

use std::env;

use image::ImageReader;
use landoltc::detect::{detect_landoltc_with_reference, load_reference};
use landoltc::detector::ReferenceModel;
use landoltc::LandoltCParams;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    landoltc::core::init_with_level(log::LevelFilter::Info)?;

    let mut args = env::args().skip(1);
    let Some(image_path) = args.next() else {
        eprintln!("usage: detect_image <image> [reference]");
        std::process::exit(2);
    };
    let reference = match args.next() {
        Some(path) => load_reference(path)?,
        None => ReferenceModel::standard(),
    };

    let img = ImageReader::open(&image_path)?.decode()?.to_luma8();
    let result = detect_landoltc_with_reference(&img, &reference, LandoltCParams::default());
    for (i, d) in result.detections.iter().enumerate() {
        match d.rotation_deg {
            Some(deg) => println!(
                "#{i}: center ({:.1}, {:.1}), gap {:.1} deg, confidence {:.2}",
                d.center.x, d.center.y, deg, d.confidence
            ),
            None => println!(
                "#{i}: center ({:.1}, {:.1}), no orientation",
                d.center.x, d.center.y
            ),
        }
    }
    println!("{} marker(s) in {}", result.detections.len(), image_path);
    Ok(())
}
