//! Scoped read-all / write-all wrappers around [`crate::encode`] and [`crate::decode`].
//!
//! Both functions open their file handle for the duration of the call only;
//! `File`'s `Drop` impl closes it on every exit path, including early returns
//! from a failed encode or decode.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::QoiError;
use crate::{decode, encode, Descriptor};

/// Reads an entire QOI file into memory and decodes it.
///
/// `target_channels` is forwarded to [`crate::decode`] unchanged (`0` infers
/// the channel count from the file's header).
pub fn read(path: impl AsRef<Path>, target_channels: u8) -> Result<(Vec<u8>, Descriptor), QoiError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    match decode(&bytes, target_channels) {
        Ok((pixels, descriptor)) => {
            log::info!(
                "read {} ({} bytes) -> {}x{} image",
                path.display(),
                bytes.len(),
                descriptor.width,
                descriptor.height
            );
            Ok((pixels, descriptor))
        }
        Err(err) => {
            log::error!("failed to decode {}: {err}", path.display());
            Err(err.into())
        }
    }
}

/// Encodes `pixels` per `descriptor` and writes the resulting QOI stream to `path`.
///
/// Returns the number of bytes written.
pub fn write(path: impl AsRef<Path>, pixels: &[u8], descriptor: &Descriptor) -> Result<usize, QoiError> {
    let path = path.as_ref();

    let bytes = match encode(pixels, descriptor) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::error!("failed to encode image for {}: {err}", path.display());
            return Err(err.into());
        }
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;

    log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len())
}
