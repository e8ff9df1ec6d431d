//! Skin-tone pixel classification

/// RGB skin rule
pub fn is_skin_rgb(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    r > 95 && g > 40 && b > 20 && max - min > 15 && (r - g).abs() > 15 && r > g && r > b
}

/// Convert to (Y, Cb, Cr)
pub fn to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.169 * r - 0.331 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.419 * g - 0.081 * b;
    (y, cb, cr)
}

/// YCbCr skin rule
pub fn is_skin_ycbcr(r: u8, g: u8, b: u8) -> bool {
    let (y, cb, cr) = to_ycbcr(r, g, b);
    y > 80.0 && cb > 85.0 && cb < 135.0 && cr > 135.0 && cr < 180.0
}

/// A pixel is skin if either rule accepts it
pub fn is_skin(r: u8, g: u8, b: u8) -> bool {
    is_skin_rgb(r, g, b) || is_skin_ycbcr(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_skin_rgb() {
        assert!(is_skin_rgb(200, 150, 120));
        assert!(is_skin(200, 150, 120));
    }

    #[test]
    fn test_blue_is_not_skin() {
        assert!(!is_skin_rgb(10, 10, 200));
        assert!(!is_skin_ycbcr(10, 10, 200));
        assert!(!is_skin(10, 10, 200));
    }

    #[test]
    fn test_grey_is_not_skin() {
        // No chroma: fails the spread test and Cr never leaves 128
        assert!(!is_skin(128, 128, 128));
        assert!(!is_skin(255, 255, 255));
        assert!(!is_skin(0, 0, 0));
    }

    #[test]
    fn test_ycbcr_only_match() {
        // |r - g| is too small for the RGB rule but the chroma is skin-like
        assert!(!is_skin_rgb(200, 185, 140));
        assert!(is_skin_ycbcr(200, 185, 140));
        assert!(is_skin(200, 185, 140));
    }

    #[test]
    fn test_ycbcr_of_neutral_grey() {
        let (y, cb, cr) = to_ycbcr(100, 100, 100);
        assert!((y - 100.0).abs() < 0.01);
        assert!((cb - 128.0).abs() < 0.1);
        assert!((cr - 128.0).abs() < 0.1);
    }
}
