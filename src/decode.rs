//! QOI byte stream → pixel buffer.

use std::convert::TryInto;

use crate::error::DecodeError;
use crate::hash::hash;
use crate::{
    Descriptor, MAX_PIXELS, QOI_HEADER_SIZE, QOI_MAGIC, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA,
    QOI_OP_RGB, QOI_OP_RGBA, QOI_OP_RUN, QOI_PADDING,
};

struct Header {
    width: u32,
    height: u32,
    channels: u8,
    colorspace: u8,
}

fn parse_header(bytes: &[u8]) -> Result<Header, DecodeError> {
    let minimum = QOI_HEADER_SIZE + QOI_PADDING;
    if bytes.len() < minimum {
        return Err(DecodeError::BufferTooShort {
            minimum,
            actual: bytes.len(),
        });
    }

    let magic = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    if magic != QOI_MAGIC {
        return Err(DecodeError::InvalidMagic(bytes[0..4].try_into().unwrap()));
    }

    let width = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions);
    }

    let channels = bytes[12];
    if channels != 3 && channels != 4 {
        return Err(DecodeError::InvalidChannels(channels));
    }

    let colorspace = bytes[13];
    if colorspace > 1 {
        return Err(DecodeError::InvalidColorspace(colorspace));
    }

    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(DecodeError::ImageTooLarge {
            pixels,
            cap: MAX_PIXELS,
        });
    }

    Ok(Header {
        width,
        height,
        channels,
        colorspace,
    })
}

/// Decodes a complete QOI byte stream into a pixel buffer and its descriptor.
///
/// `target_channels` selects the output layout: `3` for RGB, `4` for RGBA, or
/// `0` to use whatever channel count the header declares. Returns the decoded
/// pixels (row-major, tightly packed) together with the descriptor parsed
/// from the header.
pub fn decode(bytes: &[u8], target_channels: u8) -> Result<(Vec<u8>, Descriptor), DecodeError> {
    log::debug!(
        "decoding {} byte stream, target channels {}",
        bytes.len(),
        target_channels
    );

    if target_channels != 0 && target_channels != 3 && target_channels != 4 {
        let err = DecodeError::InvalidTargetChannels(target_channels);
        log::warn!("rejecting decode request: {err}");
        return Err(err);
    }

    let header = match parse_header(bytes) {
        Ok(header) => header,
        Err(err) => {
            log::warn!("rejecting decode request: {err}");
            return Err(err);
        }
    };

    let out_channels = if target_channels == 0 {
        header.channels
    } else {
        target_channels
    } as usize;

    let total_pixels = header.width as usize * header.height as usize;
    let out_len = total_pixels
        .checked_mul(out_channels)
        .ok_or(DecodeError::AllocationFailed)?;
    let mut out = vec![0u8; out_len];

    let chunks_end = bytes.len() - QOI_PADDING;
    let mut cursor = QOI_HEADER_SIZE;

    let mut table = [[0u8; 4]; 64];
    let mut curr = [0u8, 0, 0, 255];
    let mut run: u32 = 0;

    for pixel_idx in 0..total_pixels {
        if run > 0 {
            run -= 1;
        } else if cursor < chunks_end {
            let b1 = bytes[cursor];
            cursor += 1;

            if b1 == QOI_OP_RGBA {
                require(cursor, 4, chunks_end)?;
                curr = [bytes[cursor], bytes[cursor + 1], bytes[cursor + 2], bytes[cursor + 3]];
                cursor += 4;
                table[hash(curr[0], curr[1], curr[2], curr[3]) as usize] = curr;
            } else if b1 == QOI_OP_RGB {
                require(cursor, 3, chunks_end)?;
                curr[0] = bytes[cursor];
                curr[1] = bytes[cursor + 1];
                curr[2] = bytes[cursor + 2];
                cursor += 3;
                table[hash(curr[0], curr[1], curr[2], curr[3]) as usize] = curr;
            } else {
                match b1 & 0xc0 {
                    QOI_OP_INDEX => {
                        curr = table[(b1 & 0x3f) as usize];
                    }
                    QOI_OP_DIFF => {
                        curr[0] = curr[0].wrapping_add(((b1 >> 4) & 0x03).wrapping_sub(2));
                        curr[1] = curr[1].wrapping_add(((b1 >> 2) & 0x03).wrapping_sub(2));
                        curr[2] = curr[2].wrapping_add((b1 & 0x03).wrapping_sub(2));
                    }
                    QOI_OP_LUMA => {
                        require(cursor, 1, chunks_end)?;
                        let b2 = bytes[cursor];
                        cursor += 1;
                        let dg = (b1 & 0x3f).wrapping_sub(32);
                        curr[0] = curr[0]
                            .wrapping_add(dg)
                            .wrapping_add(((b2 >> 4) & 0x0f).wrapping_sub(8));
                        curr[1] = curr[1].wrapping_add(dg);
                        curr[2] = curr[2]
                            .wrapping_add(dg)
                            .wrapping_add((b2 & 0x0f).wrapping_sub(8));
                    }
                    _ => {
                        // QOI_OP_RUN: `length - 1` pixels remain after this one.
                        run = (b1 & 0x3f) as u32;
                    }
                }

                if b1 & 0xc0 != QOI_OP_RUN {
                    table[hash(curr[0], curr[1], curr[2], curr[3]) as usize] = curr;
                }
            }
        } else {
            let err = DecodeError::TruncatedStream;
            log::warn!("rejecting decode request: {err}");
            return Err(err);
        }

        let base = pixel_idx * out_channels;
        out[base] = curr[0];
        out[base + 1] = curr[1];
        out[base + 2] = curr[2];
        if out_channels == 4 {
            out[base + 3] = curr[3];
        }
    }

    Ok((
        out,
        Descriptor {
            width: header.width,
            height: header.height,
            channels: header.channels,
            colorspace: header.colorspace,
        },
    ))
}

#[inline]
fn require(cursor: usize, n: usize, chunks_end: usize) -> Result<(), DecodeError> {
    if cursor + n > chunks_end {
        Err(DecodeError::TruncatedStream)
    } else {
        Ok(())
    }
}
