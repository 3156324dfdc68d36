//! Pixel buffer → QOI byte stream.

use crate::error::EncodeError;
use crate::hash::hash;
use crate::{
    Descriptor, MAX_PIXELS, QOI_HEADER_SIZE, QOI_MAGIC, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA,
    QOI_OP_RGB, QOI_OP_RGBA, QOI_OP_RUN, QOI_TERMINATOR,
};

const DEFAULT_PREV_PIXEL: [u8; 4] = [0, 0, 0, 255];

fn validate(desc: &Descriptor, pixels_len: usize) -> Result<(), EncodeError> {
    if desc.width == 0 || desc.height == 0 {
        return Err(EncodeError::InvalidDescriptor("width and height must be non-zero"));
    }
    if desc.channels != 3 && desc.channels != 4 {
        return Err(EncodeError::InvalidDescriptor("channels must be 3 or 4"));
    }
    if desc.colorspace > 1 {
        return Err(EncodeError::InvalidDescriptor("colorspace must be 0 or 1"));
    }
    let pixels = desc.pixel_count();
    if pixels > MAX_PIXELS {
        return Err(EncodeError::InvalidDescriptor("image exceeds the maximum pixel count"));
    }
    let expected = pixels as usize * desc.channels as usize;
    if pixels_len != expected {
        return Err(EncodeError::BufferTooSmall {
            expected,
            actual: pixels_len,
        });
    }
    Ok(())
}

/// Encodes a tightly-packed, row-major pixel buffer into a complete QOI byte
/// stream: a 14-byte header, the opcode chunks, and the 8-byte terminator.
///
/// `pixels` must hold exactly `desc.width * desc.height * desc.channels`
/// bytes, with channels in RGB or RGBA order. On success, returns a freshly
/// allocated buffer owned by the caller.
pub fn encode(pixels: &[u8], desc: &Descriptor) -> Result<Vec<u8>, EncodeError> {
    log::debug!(
        "encoding {}x{} image, {} channels, colorspace {}",
        desc.width,
        desc.height,
        desc.channels,
        desc.colorspace
    );

    if let Err(err) = validate(desc, pixels.len()) {
        log::warn!("rejecting encode request: {err}");
        return Err(err);
    }

    let channels = desc.channels as usize;
    let total_pixels = desc.pixel_count() as usize;

    let capacity = total_pixels
        .checked_mul(channels + 1)
        .and_then(|n| n.checked_add(QOI_HEADER_SIZE))
        .and_then(|n| n.checked_add(QOI_TERMINATOR.len()))
        .ok_or(EncodeError::AllocationFailed)?;
    let mut out = Vec::with_capacity(capacity);

    out.extend_from_slice(&QOI_MAGIC.to_be_bytes());
    out.extend_from_slice(&desc.width.to_be_bytes());
    out.extend_from_slice(&desc.height.to_be_bytes());
    out.push(desc.channels);
    out.push(desc.colorspace);

    let mut table = [[0u8; 4]; 64];
    let mut prev = DEFAULT_PREV_PIXEL;
    let mut run: u32 = 0;

    for (idx, chunk) in pixels.chunks_exact(channels).enumerate() {
        let curr = [
            chunk[0],
            chunk[1],
            chunk[2],
            if channels == 4 { chunk[3] } else { 255 },
        ];
        let is_last = idx + 1 == total_pixels;

        if curr == prev {
            run += 1;
            if run == 62 || is_last {
                out.push(QOI_OP_RUN | (run - 1) as u8);
                run = 0;
            }
            prev = curr;
            continue;
        }

        if run > 0 {
            out.push(QOI_OP_RUN | (run - 1) as u8);
            run = 0;
        }

        let h = hash(curr[0], curr[1], curr[2], curr[3]);
        if table[h as usize] == curr {
            out.push(QOI_OP_INDEX | h);
        } else {
            table[h as usize] = curr;
            encode_new_pixel(&mut out, curr, prev);
        }

        prev = curr;
    }

    out.extend_from_slice(&QOI_TERMINATOR);

    Ok(out)
}

/// Emits the DIFF, LUMA, RGB, or RGBA chunk for a pixel that is neither a run
/// continuation nor an index hit.
fn encode_new_pixel(out: &mut Vec<u8>, curr: [u8; 4], prev: [u8; 4]) {
    if curr[3] != prev[3] {
        out.push(QOI_OP_RGBA);
        out.extend_from_slice(&curr);
        return;
    }

    let dr = curr[0].wrapping_sub(prev[0]) as i8 as i32;
    let dg = curr[1].wrapping_sub(prev[1]) as i8 as i32;
    let db = curr[2].wrapping_sub(prev[2]) as i8 as i32;

    if (-2..=1).contains(&dr) && (-2..=1).contains(&dg) && (-2..=1).contains(&db) {
        out.push(QOI_OP_DIFF | (((dr + 2) << 4) | ((dg + 2) << 2) | (db + 2)) as u8);
        return;
    }

    let dr_dg = dr - dg;
    let db_dg = db - dg;
    if (-32..=31).contains(&dg) && (-8..=7).contains(&dr_dg) && (-8..=7).contains(&db_dg) {
        out.push(QOI_OP_LUMA | (dg + 32) as u8);
        out.push((((dr_dg + 8) << 4) | (db_dg + 8)) as u8);
        return;
    }

    out.push(QOI_OP_RGB);
    out.extend_from_slice(&curr[..3]);
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use super::*;

    fn desc(width: u32, height: u32, channels: u8) -> Descriptor {
        Descriptor {
            width,
            height,
            channels,
            colorspace: 0,
        }
    }

    #[test]
    fn header_prefix_matches_magic_and_dims() {
        let pixels = [0u8, 0, 0, 255];
        let out = encode(&pixels, &desc(1, 1, 4)).unwrap();
        assert_eq!(&out[0..4], b"qoif");
        assert_eq!(u32::from_be_bytes(out[4..8].try_into().unwrap()), 1);
        assert_eq!(u32::from_be_bytes(out[8..12].try_into().unwrap()), 1);
    }

    #[test]
    fn terminator_suffix() {
        let pixels = [0u8, 0, 0, 255];
        let out = encode(&pixels, &desc(1, 1, 4)).unwrap();
        assert_eq!(&out[out.len() - 8..], &QOI_TERMINATOR);
    }

    #[test]
    fn scenario_a_single_opaque_black_pixel_is_one_run() {
        let pixels = [0u8, 0, 0, 255];
        let out = encode(&pixels, &desc(1, 1, 4)).unwrap();
        let expected = [
            0x71, 0x6f, 0x69, 0x66, 0, 0, 0, 1, 0, 0, 0, 1, 4, 0, 0xc0, 0, 0, 0, 0, 0, 0, 0, 1,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn scenario_b_small_rgb_delta_falls_back_to_rgb_opcode() {
        let pixels = [10u8, 20, 30];
        let out = encode(&pixels, &desc(1, 1, 3)).unwrap();
        assert_eq!(&out[14..18], &[0xFE, 10, 20, 30]);
    }

    #[test]
    fn scenario_c_two_identical_rgba_pixels_is_run_two() {
        let pixels = [0u8, 0, 0, 255, 0, 0, 0, 255];
        let out = encode(&pixels, &desc(2, 1, 4)).unwrap();
        assert_eq!(out[14], 0xc1);
    }

    #[test]
    fn scenario_d_run_then_luma() {
        let pixels = [0u8, 0, 0, 5, 5, 5];
        let out = encode(&pixels, &desc(2, 1, 3)).unwrap();
        assert_eq!(&out[14..17], &[0xc0, 0xa5, 0x88]);
    }

    #[test]
    fn small_delta_from_default_prev_uses_diff_opcode() {
        // dr = dg = db = 1 relative to the initial (0,0,0,255) prev pixel.
        let pixels = [1u8, 1, 1];
        let out = encode(&pixels, &desc(1, 1, 3)).unwrap();
        assert_eq!(out[14], 0x40 | (3 << 4) | (3 << 2) | 3);
    }

    #[test]
    fn diff_byte_bias_matches_spec_formula() {
        // dr = dg = db = 0 biases to 2 in each 2-bit field: 0x40 | (2<<4) | (2<<2) | 2.
        let mut out = Vec::new();
        encode_new_pixel(&mut out, [5, 5, 5, 255], [5, 5, 5, 255]);
        assert_eq!(out, vec![0x6a]);
    }

    #[test]
    fn sixty_two_identical_pixels_is_single_run_byte() {
        let mut pixels = Vec::new();
        for _ in 0..62 {
            pixels.extend_from_slice(&[0, 0, 0, 255]);
        }
        let out = encode(&pixels, &desc(62, 1, 4)).unwrap();
        assert_eq!(&out[14..15], &[0xfd]);
        assert_eq!(&out[15..23], &QOI_TERMINATOR);
    }

    #[test]
    fn sixty_three_identical_pixels_splits_into_two_runs() {
        let mut pixels = Vec::new();
        for _ in 0..63 {
            pixels.extend_from_slice(&[0, 0, 0, 255]);
        }
        let out = encode(&pixels, &desc(63, 1, 4)).unwrap();
        assert_eq!(&out[14..16], &[0xfd, 0xc0]);
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = encode(&[], &desc(0, 1, 4)).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidDescriptor(_)));
    }

    #[test]
    fn bad_channel_count_is_rejected() {
        let err = encode(&[1, 2, 3, 4, 5], &desc(1, 1, 5)).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidDescriptor(_)));
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let err = encode(&[0, 0, 0], &desc(1, 1, 4)).unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferTooSmall {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn oversized_image_is_rejected() {
        let desc = desc(30_000, 30_000, 4);
        let err = encode(&[], &desc).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidDescriptor(_)));
    }
}
