//! Video frame types

use image::RgbaImage;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Decoded RGBA video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGBA pixel data (width * height * 4)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl Frame {
    /// Create a new frame from raw RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame filled with a single RGB colour (alpha = 255)
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::new(data, width, height, 0, 0)
    }

    /// Wrap a decoded image
    pub fn from_rgba_image(img: RgbaImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Total pixel area
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// A frame can be analysed only if it has a non-zero area and a buffer
    /// large enough for every pixel.
    pub fn is_drawable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() >= self.area() as usize * BYTES_PER_PIXEL
    }

    /// Get the RGB components at (x, y), ignoring alpha
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Paint an axis-aligned rectangle, clipped to the frame
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                let idx = (row as usize * self.width as usize + col as usize) * BYTES_PER_PIXEL;
                if let Some(px) = self.data.get_mut(idx..idx + 3) {
                    px.copy_from_slice(&rgb);
                }
            }
        }
    }
}

impl From<RgbaImage> for Frame {
    fn from(img: RgbaImage) -> Self {
        Self::from_rgba_image(img, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    #[test]
    fn test_zero_area_not_drawable() {
        let frame = Frame::new(Vec::new(), 0, 480, 0, 0);
        assert!(!frame.is_drawable());
        let frame = Frame::new(Vec::new(), 640, 0, 0, 0);
        assert!(!frame.is_drawable());
    }

    #[test]
    fn test_short_buffer_not_drawable() {
        let frame = Frame::new(vec![0; 10], 4, 4, 0, 0);
        assert!(!frame.is_drawable());
    }

    #[test]
    fn test_rgb_at() {
        let mut frame = Frame::filled(8, 8, [10, 10, 200]);
        frame.fill_rect(2, 2, 2, 2, [200, 150, 120]);

        assert_eq!(frame.rgb_at(0, 0), Some([10, 10, 200]));
        assert_eq!(frame.rgb_at(3, 3), Some([200, 150, 120]));
        assert_eq!(frame.rgb_at(8, 0), None);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0]);
        frame.fill_rect(3, 3, 10, 10, [255, 255, 255]);
        assert_eq!(frame.rgb_at(3, 3), Some([255, 255, 255]));
        assert_eq!(frame.data.len(), 4 * 4 * BYTES_PER_PIXEL);
    }

    #[test]
    fn test_from_rgba_image() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let frame = Frame::from(img);
        assert_eq!((frame.width, frame.height), (3, 2));
        assert!(frame.is_drawable());
        assert_eq!(frame.rgb_at(2, 1), Some([1, 2, 3]));
    }

    proptest! {
        #[test]
        fn prop_fill_rect_stays_in_bounds(
            w in 1u32..32, h in 1u32..32,
            x in 0u32..40, y in 0u32..40,
            rw in 0u32..40, rh in 0u32..40,
        ) {
            let mut frame = Frame::filled(w, h, [0, 0, 0]);
            frame.fill_rect(x, y, rw, rh, [255, 255, 255]);

            prop_assert_eq!(frame.data.len(), (w * h) as usize * BYTES_PER_PIXEL);
            prop_assert!(frame.is_drawable());
            for py in 0..h {
                for px in 0..w {
                    let inside = px >= x && px < x.saturating_add(rw) && py >= y && py < y.saturating_add(rh);
                    let expected = if inside { [255, 255, 255] } else { [0, 0, 0] };
                    prop_assert_eq!(frame.rgb_at(px, py), Some(expected));
                }
            }
        }
    }
}
