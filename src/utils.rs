use image::{ DynamicImage, GrayImage, Luma };
use imageproc::{ contrast, map };

use std::path::Path;

/// extensions accepted when scanning a directory, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// luminance conversion
pub fn grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// global binarization at the otsu level, strokes end up as 0 or 255
pub fn threshold(gray: &GrayImage) -> GrayImage {
    let level = contrast::otsu_level(gray);
    map::map_colors(gray, |p: Luma<u8>| {
        if p[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// the filter chain run before OCR
pub fn apply_filter(img: &DynamicImage) -> GrayImage {
    threshold(&grayscale(img))
}

pub fn has_image_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|allowed| allowed.as_ref().eq_ignore_ascii_case(ext)),
        None => false,
    }
}


#[cfg(test)]
mod test {
    use image::{ ImageBuffer, Rgb, RgbImage };

    use super::*;

    fn half_split() -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(20, 10, |x, _| {
            if x < 10 { Rgb([30, 40, 50]) } else { Rgb([220, 210, 200]) }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn grayscale_keeps_dimensions() {
        let gray = grayscale(&half_split());
        assert_eq!(gray.dimensions(), (20, 10));
        assert!(gray.get_pixel(0, 0)[0] < gray.get_pixel(19, 0)[0]);
    }

    #[test]
    fn threshold_is_two_level() {
        let gray: GrayImage = ImageBuffer::from_fn(32, 8, |x, y| Luma([(x * 8 + y) as u8]));
        let binary = threshold(&gray);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn threshold_separates_dark_from_light() {
        let binary = apply_filter(&half_split());
        assert_eq!(binary.get_pixel(2, 5)[0], 0);
        assert_eq!(binary.get_pixel(17, 5)[0], 255);
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_image_extension(Path::new("a/b/car.JPG"), &IMAGE_EXTENSIONS));
        assert!(has_image_extension(Path::new("car.webp"), &IMAGE_EXTENSIONS));
        assert!(has_image_extension(Path::new("car.Jpeg"), &IMAGE_EXTENSIONS));
        assert!(!has_image_extension(Path::new("car.gif"), &IMAGE_EXTENSIONS));
        assert!(!has_image_extension(Path::new("README"), &IMAGE_EXTENSIONS));
    }
}
