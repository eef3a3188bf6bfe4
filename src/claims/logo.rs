use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

pub const WIDTH: u32 = 300;
pub const HEIGHT: u32 = 100;

const GRID: u32 = 5;
const CELL: u32 = 14;
const MARGIN: u32 = 15;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

pub fn logo_path(dir: &Path, clinic_name: &str) -> PathBuf {
    let stem = UNSAFE_CHARS.replace_all(clinic_name, "_");
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "clinic" } else { stem };
    dir.join(format!("logo_{}.png", stem))
}

/// True when the file exists and decodes as an image.
pub fn verify_logo(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    let decoded = image::io::Reader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(image::ImageError::from)
        .and_then(|r| r.decode());
    match decoded {
        Ok(_) => true,
        Err(e) => {
            warn!("Logo {:?} failed verification: {}", path, e);
            false
        }
    }
}

/// White 300×100 PNG with a mirrored 5×5 monogram derived from the name and a
/// colour band beside it. Written through a temporary file so concurrent
/// readers never see a partial image.
pub fn generate_logo(clinic_name: &str, color: [u8; 3], path: &Path) -> Result<()> {
    let img = draw_logo(clinic_name, color);

    let tmp = path.with_file_name(format!(
        "{}.{:?}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("logo"),
        std::thread::current().id()
    ));
    img.save_with_format(&tmp, ImageFormat::Png)
        .with_context(|| format!("Failed to write logo {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to move logo into {:?}", path))?;

    info!("Logo generated for {} and saved to {:?}", clinic_name, path);
    Ok(())
}

fn draw_logo(clinic_name: &str, color: [u8; 3]) -> RgbImage {
    let ink = Rgb(color);
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
    let bits = fnv1a(clinic_name.as_bytes());

    for row in 0..GRID {
        for col in 0..=GRID / 2 {
            if bits >> (row * 3 + col) & 1 == 0 {
                continue;
            }
            for c in [col, GRID - 1 - col] {
                fill(&mut img, MARGIN + c * CELL, MARGIN + row * CELL, CELL, CELL, ink);
            }
        }
    }

    // wordmark band, length varies with the name
    let band = 60 + (clinic_name.chars().count() as u32 * 6).min(120);
    fill(&mut img, 110, 40, band, 8, ink);
    fill(&mut img, 110, 56, band / 2, 4, ink);
    img
}

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(HEIGHT) {
        for px in x..(x + w).min(WIDTH) {
            img.put_pixel(px, py, color);
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Reuse a logo that verifies; otherwise (re)generate it. `None` when no usable
/// logo could be produced.
pub fn ensure_logo(dir: &Path, clinic_name: &str, color: [u8; 3]) -> Option<PathBuf> {
    let path = logo_path(dir, clinic_name);
    if verify_logo(&path) {
        return Some(path);
    }
    if let Err(e) = generate_logo(clinic_name, color, &path) {
        warn!("Error generating logo for {}: {:#}", clinic_name, e);
    }
    verify_logo(&path).then_some(path)
}
