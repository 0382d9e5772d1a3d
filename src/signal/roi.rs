use image::{imageops, ImageFormat, RgbImage};
use std::io::Cursor;

use crate::config::ChannelMap;
use crate::error::OximeterError;

/// Centered square crop with side `min(width, height) / 3`.
pub fn centered_roi(frame: &RgbImage) -> Option<RgbImage> {
    let (width, height) = frame.dimensions();
    let side = width.min(height) / 3;
    if side == 0 {
        return None;
    }
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    Some(imageops::crop_imm(frame, x, y, side, side).to_image())
}

/// Mean intensity of the configured `(red, ir)` planes across the ROI.
pub fn reduce_frame(roi: &RgbImage, channels: ChannelMap) -> Option<(f64, f64)> {
    let pixel_count = roi.width() as u64 * roi.height() as u64;
    if pixel_count == 0 {
        return None;
    }
    let (red_idx, ir_idx) = (channels.red.index(), channels.ir.index());
    let (mut red_sum, mut ir_sum) = (0u64, 0u64);
    for pixel in roi.pixels() {
        red_sum += pixel.0[red_idx] as u64;
        ir_sum += pixel.0[ir_idx] as u64;
    }
    Some((
        red_sum as f64 / pixel_count as f64,
        ir_sum as f64 / pixel_count as f64,
    ))
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, OximeterError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OximeterError::Encode("image has no pixels".into()));
    }
    let mut output = Vec::new();
    image.write_to(&mut Cursor::new(&mut output), ImageFormat::Jpeg)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorChannel;
    use image::Rgb;

    #[test]
    fn roi_is_centered_third() {
        let frame = RgbImage::from_fn(640, 480, |x, y| {
            if (240..400).contains(&x) && (160..320).contains(&y) {
                Rgb([200, 0, 50])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let roi = centered_roi(&frame).unwrap();
        assert_eq!(roi.dimensions(), (160, 160));
        assert!(roi.pixels().all(|p| p.0 == [200, 0, 50]));
    }

    #[test]
    fn tiny_frame_has_no_roi() {
        assert!(centered_roi(&RgbImage::new(2, 100)).is_none());
        assert!(centered_roi(&RgbImage::new(3, 3)).is_some());
    }

    #[test]
    fn reduces_configured_channels() {
        let mut roi = RgbImage::from_pixel(2, 2, Rgb([100, 20, 40]));
        roi.put_pixel(0, 0, Rgb([200, 20, 80]));
        let (red, ir) = reduce_frame(&roi, ChannelMap::default()).unwrap();
        assert_eq!(red, 125.0);
        assert_eq!(ir, 50.0);

        let green_ir = ChannelMap {
            red: ColorChannel::Red,
            ir: ColorChannel::Green,
        };
        let (_, ir) = reduce_frame(&roi, green_ir).unwrap();
        assert_eq!(ir, 20.0);
    }

    #[test]
    fn empty_roi_yields_nothing() {
        assert!(reduce_frame(&RgbImage::new(0, 0), ChannelMap::default()).is_none());
    }

    #[test]
    fn jpeg_export() {
        let roi = RgbImage::from_pixel(16, 16, Rgb([180, 90, 60]));
        let bytes = encode_jpeg(&roi).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert!(encode_jpeg(&RgbImage::new(0, 0)).is_err());
    }
}
