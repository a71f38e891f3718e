use std::path::Path;

use image::imageops::{self, brighten, contrast};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, RgbImage};
use tempfile::NamedTempFile;

use crate::models::{Enhancement, Region};
use crate::utils::{ScanError, ScanResult};

/// Image loading and the geometric / photometric transforms the decode
/// cascade is allowed to apply. Every transform returns a new buffer.
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn load(image_path: &Path) -> ScanResult<RgbImage> {
        let img = image::open(image_path).map_err(|e| ScanError::ImageLoad {
            path: image_path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(img.to_rgb8())
    }

    pub fn grayscale(img: &RgbImage) -> GrayImage {
        imageops::grayscale(img)
    }

    pub fn crop(img: &RgbImage, region: &Region) -> RgbImage {
        imageops::crop_imm(img, region.x, region.y, region.width, region.height).to_image()
    }

    /// Clockwise rotation by a multiple of 90 degrees.
    pub fn rotate(img: &RgbImage, degrees: u16) -> RgbImage {
        match degrees % 360 {
            90 => imageops::rotate90(img),
            180 => imageops::rotate180(img),
            270 => imageops::rotate270(img),
            _ => img.clone(),
        }
    }

    /// Bitwise NOT of every channel.
    pub fn invert(img: &RgbImage) -> RgbImage {
        let mut inverted = img.clone();
        imageops::invert(&mut inverted);
        inverted
    }

    pub fn enhance(img: &RgbImage, enhancement: Enhancement) -> RgbImage {
        let gray = Self::grayscale(img);
        let enhanced = match enhancement {
            Enhancement::Contrast => {
                // Small images get a stronger push
                let fast_path = img.width() > 1200 && img.height() > 800;
                let contrast_factor = if fast_path { 10.0 } else { 20.0 };
                let brightness_adjust = if fast_path { 5 } else { 10 };
                brighten(&contrast(&gray, contrast_factor), brightness_adjust)
            }
            Enhancement::AdaptiveThreshold => {
                let window_size = if img.width() > 1200 { 11 } else { 15 };
                Self::adaptive_threshold(&gray, window_size, 5)
            }
        };
        DynamicImage::ImageLuma8(enhanced).to_rgb8()
    }

    /// Mean-window binarization using per-row prefix sums.
    fn adaptive_threshold(gray: &GrayImage, window_size: u32, bias: i32) -> GrayImage {
        let (width, height) = gray.dimensions();
        let mut result = ImageBuffer::new(width, height);
        if width == 0 || height == 0 {
            return result;
        }

        let mut row_sums = vec![vec![0u32; width as usize + 1]; height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                row_sums[y][x + 1] = row_sums[y][x] + gray.get_pixel(x as u32, y as u32)[0] as u32;
            }
        }

        let half = window_size / 2;
        for y in 0..height {
            let start_y = y.saturating_sub(half) as usize;
            let end_y = (y + half).min(height - 1) as usize;
            for x in 0..width {
                let start_x = x.saturating_sub(half) as usize;
                let end_x = (x + half).min(width - 1) as usize;

                let mut sum = 0u32;
                for row in &row_sums[start_y..=end_y] {
                    sum += row[end_x + 1] - row[start_x];
                }
                let count = ((end_x - start_x + 1) * (end_y - start_y + 1)) as u32;

                let threshold = (sum / count) as i32 - bias;
                let value = gray.get_pixel(x, y)[0] as i32;
                result.put_pixel(x, y, Luma([if value > threshold { 255 } else { 0 }]));
            }
        }

        result
    }

    /// Write the image to a temporary PNG; the file lives as long as the
    /// returned handle.
    pub fn save_to_temp_png(img: &RgbImage) -> ScanResult<NamedTempFile> {
        let temp_file = tempfile::Builder::new().suffix(".png").tempfile()?;
        img.save_with_format(temp_file.path(), ImageFormat::Png)
            .map_err(|e| ScanError::ImageProcessing(format!("Failed to encode temp image: {}", e)))?;
        Ok(temp_file)
    }
}
