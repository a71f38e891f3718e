use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::horizontal_sobel;
use imageproc::morphology::{dilate, erode};
use log::debug;

use crate::models::{Region, RegionConfig};
use crate::processing::image::ImageProcessor;

/// Proposes sub-rectangles that look like a stacked barcode: bars fused
/// into a blob by a wide closing element, then filtered by size and shape.
pub struct RegionCandidateFinder {
    config: RegionConfig,
}

impl RegionCandidateFinder {
    pub fn new(config: RegionConfig) -> Self {
        RegionCandidateFinder { config }
    }

    /// Candidate regions, largest area first. Empty means "no obvious
    /// region", and the caller should fall back to the full frame.
    pub fn find(&self, image: &RgbImage) -> Vec<Region> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let gray = ImageProcessor::grayscale(image);
        let smoothed = Self::blur(&gray, self.config.gradient_blur_sigma);
        let gradient = Self::horizontal_gradient(&smoothed);

        let heavy = Self::blur(&smoothed, self.config.threshold_blur_sigma);
        let level = otsu_level(&heavy);
        let mask = threshold(&heavy, level);
        let mask = Self::close_rect(&mask, self.config.close_kernel_width, self.config.close_kernel_height);
        let mask = erode(&mask, Norm::LInf, self.config.cleanup_iterations);
        let mask = dilate(&mask, Norm::LInf, self.config.cleanup_iterations);

        let image_area = width as f64 * height as f64;
        let mut candidates = Vec::new();

        for contour in find_contours::<u32>(&mask) {
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }
            let Some((rx, ry, rw, rh)) = Self::bounding_rect(&contour.points) else {
                continue;
            };

            if rw < self.config.min_side || rh < self.config.min_side {
                continue;
            }
            let area_ratio = (rw as f64 * rh as f64) / image_area;
            if area_ratio < self.config.min_area_ratio {
                continue;
            }
            let aspect = rw as f64 / rh as f64;
            if aspect < self.config.min_aspect || aspect > self.config.max_aspect {
                continue;
            }

            let mut region = self.pad((rx, ry, rw, rh), width, height);
            region.gradient_energy = Self::mean_in(&gradient, &region);
            candidates.push(region);
        }

        candidates.sort_by(|a, b| b.area().cmp(&a.area()));
        candidates.truncate(self.config.max_candidates);

        debug!(
            "Region finder: otsu level {}, {} candidate(s) {:?}",
            level,
            candidates.len(),
            candidates
                .iter()
                .map(|r| (r.x, r.y, r.width, r.height, r.gradient_energy))
                .collect::<Vec<_>>()
        );

        candidates
    }

    fn blur(img: &GrayImage, sigma: f32) -> GrayImage {
        if sigma > 0.0 {
            gaussian_blur_f32(img, sigma)
        } else {
            img.clone()
        }
    }

    /// |d/dx| of intensity; strong on the vertical bar edges of linear and
    /// stacked symbols.
    fn horizontal_gradient(img: &GrayImage) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        let sobel = horizontal_sobel(img);
        ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
            Luma([sobel.get_pixel(x, y)[0].unsigned_abs()])
        })
    }

    /// Grows a detected rectangle by `padding_ratio` of its shorter side on
    /// every side, cutting each side at the image edge independently.
    fn pad(&self, (rx, ry, rw, rh): (u32, u32, u32, u32), width: u32, height: u32) -> Region {
        let pad = (rw.min(rh) as f64 * self.config.padding_ratio) as u32;
        let x = rx.saturating_sub(pad);
        let y = ry.saturating_sub(pad);
        let right = rx.saturating_add(rw).saturating_add(pad).min(width);
        let bottom = ry.saturating_add(rh).saturating_add(pad).min(height);
        Region { x, y, width: right - x, height: bottom - y, gradient_energy: 0.0 }
    }

    fn mean_in(gradient: &ImageBuffer<Luma<u16>, Vec<u16>>, region: &Region) -> f32 {
        let mut sum = 0u64;
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                sum += gradient.get_pixel(x, y)[0] as u64;
            }
        }
        let count = region.area().max(1);
        sum as f32 / count as f32
    }

    fn bounding_rect(points: &[imageproc::point::Point<u32>]) -> Option<(u32, u32, u32, u32)> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Closing (dilate then erode) with a `kernel_width` x `kernel_height`
    /// rectangle. Separable: a row pass then a column pass.
    fn close_rect(mask: &GrayImage, kernel_width: u32, kernel_height: u32) -> GrayImage {
        let dilated = Self::rect_filter(mask, kernel_width, kernel_height, true);
        Self::rect_filter(&dilated, kernel_width, kernel_height, false)
    }

    fn rect_filter(mask: &GrayImage, kernel_width: u32, kernel_height: u32, take_max: bool) -> GrayImage {
        let (width, height) = mask.dimensions();
        let half_w = kernel_width / 2;
        let half_h = kernel_height / 2;
        let pick = |a: u8, b: u8| if take_max { a.max(b) } else { a.min(b) };
        let seed = if take_max { 0u8 } else { 255u8 };

        let mut rows = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let start = x.saturating_sub(half_w);
                let end = (x + half_w).min(width - 1);
                let value = (start..=end).fold(seed, |acc, nx| pick(acc, mask.get_pixel(nx, y)[0]));
                rows.put_pixel(x, y, Luma([value]));
            }
        }

        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            let start = y.saturating_sub(half_h);
            let end = (y + half_h).min(height - 1);
            for x in 0..width {
                let value = (start..=end).fold(seed, |acc, ny| pick(acc, rows.get_pixel(x, ny)[0]));
                out.put_pixel(x, y, Luma([value]));
            }
        }
        out
    }
}
