use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{otsu_level, threshold};

/// Value written into binary masks for foreground pixels
pub const FOREGROUND: u8 = 255;

/// Luma conversion of a color or single-channel image
pub fn to_intensity(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Return an inverted copy so dark marks become bright
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut inverted = gray.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// Binarize with a fixed cutoff: pixels strictly above `cutoff` become foreground
pub fn binarize_fixed(gray: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(gray, cutoff)
}

/// Binarize with Otsu's global threshold, returning the mask and the chosen level.
///
/// An image without contrast has no foreground.
pub fn binarize_otsu(gray: &GrayImage) -> (GrayImage, u8) {
    let (min, max) = gray.pixels().fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if min >= max {
        let (width, height) = gray.dimensions();
        return (GrayImage::new(width, height), max);
    }

    let level = otsu_level(gray);
    (threshold(gray, level), level)
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

#[inline]
pub fn is_foreground(pixel: &Luma<u8>) -> bool {
    pixel[0] > 0
}

/// Number of non-zero pixels in a mask
pub fn count_foreground(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| is_foreground(p)).count()
}

/// Pixel-wise `a AND NOT b`
pub fn subtract_masks(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if is_foreground(a.get_pixel(x, y)) && !is_foreground(b.get_pixel(x, y)) {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Deterministic pseudo-random color for a label, used in debug renderings
pub fn label_color(label: u32) -> Rgb<u8> {
    let hashed = label.wrapping_mul(2_654_435_761);
    Rgb([
        (hashed >> 24) as u8 | 0x40,
        (hashed >> 16) as u8 | 0x40,
        (hashed >> 8) as u8 | 0x40,
    ])
}

/// Render a single-channel mask as RGB for saving next to color outputs
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(mask.clone()).to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_binarization_is_strictly_greater() {
        let gray = GrayImage::from_raw(3, 1, vec![49, 50, 51]).unwrap();
        let binary = binarize_fixed(&gray, 50);
        assert_eq!(binary.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn otsu_separates_bimodal_image() {
        let gray = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([20]) } else { Luma([220]) });
        let (binary, level) = binarize_otsu(&gray);
        assert!(level >= 20 && level < 220);
        assert_eq!(count_foreground(&binary), 100);
        assert_eq!(binary.get_pixel(15, 5)[0], FOREGROUND);
    }

    #[test]
    fn uniform_image_has_no_otsu_foreground() {
        let gray = GrayImage::from_pixel(8, 8, Luma([90]));
        let (binary, _) = binarize_otsu(&gray);
        assert_eq!(count_foreground(&binary), 0);
    }

    #[test]
    fn subtract_removes_overlap() {
        let a = GrayImage::from_raw(3, 1, vec![255, 255, 0]).unwrap();
        let b = GrayImage::from_raw(3, 1, vec![0, 255, 255]).unwrap();
        assert_eq!(subtract_masks(&a, &b).as_raw(), &vec![255, 0, 0]);
    }
}
