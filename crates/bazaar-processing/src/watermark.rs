use image::{imageops, DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

/// Watermark configuration
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub position: WatermarkPosition,
    pub size: WatermarkSize,
    pub opacity: f32,
}

/// Watermark position
#[derive(Debug, Clone)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Watermark size
#[derive(Debug, Clone)]
pub enum WatermarkSize {
    Absolute { width: u32, height: u32 },
    /// Width as a percentage of the base image width; the overlay keeps its
    /// aspect ratio.
    Relative { percent: f32 },
}

pub struct Watermark;

impl Watermark {
    /// Apply watermark overlay to an image.
    pub fn apply(
        img: DynamicImage,
        watermark_data: &[u8],
        config: &WatermarkConfig,
    ) -> Result<DynamicImage, anyhow::Error> {
        // Load watermark image
        let cursor = Cursor::new(watermark_data);
        let reader = ImageReader::new(cursor).with_guessed_format()?;
        let mut watermark_img = reader.decode()?.to_rgba8();

        let (img_width, img_height) = img.dimensions();
        let (wm_width, wm_height) = watermark_img.dimensions();

        // Calculate watermark size
        let (target_wm_width, target_wm_height) = match config.size {
            WatermarkSize::Absolute { width, height } => {
                (width.min(img_width), height.min(img_height))
            }
            WatermarkSize::Relative { percent } => {
                let w = (img_width as f32 * percent / 100.0).round() as u32;
                let h = (w as f32 * wm_height as f32 / wm_width as f32).round() as u32;
                (w.clamp(1, img_width), h.clamp(1, img_height))
            }
        };

        // Resize watermark if needed
        if wm_width != target_wm_width || wm_height != target_wm_height {
            let filter = if target_wm_width < wm_width {
                imageops::FilterType::Triangle
            } else {
                imageops::FilterType::Lanczos3
            };
            let resized = DynamicImage::ImageRgba8(watermark_img);
            let resized = resized.resize_exact(target_wm_width, target_wm_height, filter);
            watermark_img = resized.to_rgba8();
        }

        // Apply opacity
        if config.opacity < 1.0 {
            for pixel in watermark_img.pixels_mut() {
                pixel[3] = (pixel[3] as f32 * config.opacity) as u8;
            }
        }

        // Calculate position
        let (x, y) = match config.position {
            WatermarkPosition::TopLeft => (0, 0),
            WatermarkPosition::TopRight => ((img_width as i64 - target_wm_width as i64).max(0), 0),
            WatermarkPosition::BottomLeft => {
                (0, (img_height as i64 - target_wm_height as i64).max(0))
            }
            WatermarkPosition::BottomRight => (
                (img_width as i64 - target_wm_width as i64).max(0),
                (img_height as i64 - target_wm_height as i64).max(0),
            ),
            WatermarkPosition::Center => (
                ((img_width as i64 - target_wm_width as i64) / 2).max(0),
                ((img_height as i64 - target_wm_height as i64) / 2).max(0),
            ),
        };

        // Convert main image to RGBA if needed
        let mut img_rgba = img.to_rgba8();

        // Overlay watermark
        imageops::overlay(&mut img_rgba, &watermark_img, x, y);

        Ok(DynamicImage::ImageRgba8(img_rgba))
    }
}

/// Holds the overlay bytes and stamps every listing image the same way:
/// centered, semi-transparent, sized relative to the image width.
#[derive(Clone)]
pub struct Watermarker {
    overlay: Vec<u8>,
    config: WatermarkConfig,
}

impl Watermarker {
    pub fn new(overlay: Vec<u8>, scale_percent: f32, opacity: f32) -> Self {
        Watermarker {
            overlay,
            config: WatermarkConfig {
                position: WatermarkPosition::Center,
                size: WatermarkSize::Relative {
                    percent: scale_percent,
                },
                opacity,
            },
        }
    }

    /// Decode raw upload bytes, stamp the overlay and re-encode as JPEG.
    pub fn stamp(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
        let cursor = Cursor::new(data);
        let img = ImageReader::new(cursor).with_guessed_format()?.decode()?;

        let stamped = Watermark::apply(img, &self.overlay, &self.config)?;

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(stamped.to_rgb8());
        let mut out = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        ))
    }

    fn create_test_overlay(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        buffer
    }

    fn encode_png(img: &DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_apply_preserves_dimensions() {
        let img = create_test_image(200, 150);
        let overlay = create_test_overlay(50, 50);
        let config = WatermarkConfig {
            position: WatermarkPosition::Center,
            size: WatermarkSize::Relative { percent: 40.0 },
            opacity: 0.5,
        };

        let result = Watermark::apply(img, &overlay, &config).unwrap();
        assert_eq!(result.dimensions(), (200, 150));
    }

    #[test]
    fn test_relative_size_scales_with_width() {
        // 40% of a 200px wide image on a square overlay gives an 80px stamp;
        // darkened pixels should appear near the center but not at the edges.
        let img = create_test_image(200, 200);
        let overlay = create_test_overlay(50, 50);
        let config = WatermarkConfig {
            position: WatermarkPosition::Center,
            size: WatermarkSize::Relative { percent: 40.0 },
            opacity: 1.0,
        };

        let result = Watermark::apply(img, &overlay, &config).unwrap();
        let center = result.get_pixel(100, 100);
        let corner = result.get_pixel(0, 0);
        assert_eq!(center.0[0], 0);
        assert_eq!(corner.0[0], 255);
    }

    #[test]
    fn test_oversized_absolute_clamped() {
        let img = create_test_image(100, 100);
        let overlay = create_test_overlay(50, 50);
        let config = WatermarkConfig {
            position: WatermarkPosition::TopLeft,
            size: WatermarkSize::Absolute {
                width: 400,
                height: 400,
            },
            opacity: 1.0,
        };

        let result = Watermark::apply(img, &overlay, &config).unwrap();
        assert_eq!(result.dimensions(), (100, 100));
    }

    #[test]
    fn test_watermarker_outputs_jpeg() {
        let watermarker = Watermarker::new(create_test_overlay(50, 50), 40.0, 0.5);
        let input = encode_png(&create_test_image(120, 80));

        let out = watermarker.stamp(&input).unwrap();

        let decoded = ImageReader::new(Cursor::new(&out))
            .with_guessed_format()
            .unwrap();
        assert_eq!(decoded.format(), Some(image::ImageFormat::Jpeg));
        assert_eq!(decoded.decode().unwrap().dimensions(), (120, 80));
    }

    #[test]
    fn test_watermarker_rejects_garbage_input() {
        let watermarker = Watermarker::new(create_test_overlay(10, 10), 40.0, 0.5);
        assert!(watermarker.stamp(b"not an image").is_err());
    }
}
