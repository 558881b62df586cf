//! Decode, fit, and blur box art on the worker threads.
//!
//! Every surface is an RGBA8 [`RgbaImage`] regardless of the source format,
//! so the fit and blur code never has to branch on pixel layout.

use super::error::Result;
use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, RgbaImage};
use log::warn;
use std::path::Path;

/// Loads `path` as RGBA8. The extension is tried first; if that fails the
/// format is sniffed from the file contents.
pub fn decode(path: &Path) -> Result<RgbaImage> {
    if let Ok(fmt) = ImageFormat::from_path(path) {
        let mut reader = ImageReader::open(path)?;
        reader.set_format(fmt);
        if let Ok(img) = reader.decode() {
            return Ok(img.to_rgba8());
        }
    }

    let guessed = ImageReader::open(path)?.with_guessed_format()?;
    if let (Ok(hint), Some(real)) = (ImageFormat::from_path(path), guessed.format())
        && hint != real
    {
        warn!("Art file '{}' is really {:?}", path.display(), real);
    }
    Ok(guessed.decode()?.to_rgba8())
}

/// Center-crops `src` to the aspect ratio of `target_w x target_h`, then
/// scales the crop to exactly that size.
pub fn fit_to_target(src: &RgbaImage, target_w: u32, target_h: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || target_w == 0 || target_h == 0 {
        return RgbaImage::new(target_w.max(1), target_h.max(1));
    }

    let target_ratio = f64::from(target_w) / f64::from(target_h);
    let src_ratio = f64::from(w) / f64::from(h);
    let (crop_x, crop_y, crop_w, crop_h) = if src_ratio > target_ratio {
        let cw = ((f64::from(h) * target_ratio) as u32).clamp(1, w);
        ((w - cw) / 2, 0, cw, h)
    } else {
        let ch = ((f64::from(w) / target_ratio) as u32).clamp(1, h);
        (0, (h - ch) / 2, w, ch)
    };

    let cropped = imageops::crop_imm(src, crop_x, crop_y, crop_w, crop_h).to_image();
    if cropped.dimensions() == (target_w, target_h) {
        return cropped;
    }
    imageops::resize(&cropped, target_w, target_h, FilterType::Triangle)
}

/// Box blur: each output channel is the mean of that channel over the
/// `(2r+1)^2` window, counting only samples inside the image.
pub fn box_blur(src: &RgbaImage, radius: u32) -> RgbaImage {
    if radius == 0 {
        return src.clone();
    }
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w, h);

    let r = i64::from(radius);
    for y in 0..h {
        for x in 0..w {
            let mut sum = [0u32; 4];
            let mut count = 0u32;
            for ky in -r..=r {
                let py = i64::from(y) + ky;
                if py < 0 || py >= i64::from(h) {
                    continue;
                }
                for kx in -r..=r {
                    let px = i64::from(x) + kx;
                    if px < 0 || px >= i64::from(w) {
                        continue;
                    }
                    let p = src.get_pixel(px as u32, py as u32).0;
                    for (acc, c) in sum.iter_mut().zip(p) {
                        *acc += u32::from(c);
                    }
                    count += 1;
                }
            }
            let px = out.get_pixel_mut(x, y);
            for (dst, acc) in px.0.iter_mut().zip(sum) {
                *dst = (acc / count) as u8;
            }
        }
    }
    out
}
