//! `qoiconv <infile> <outfile>` — converts between PNG and QOI based on file extension.
//!
//! Exactly one of `infile`/`outfile` must end in `.qoi`; the other must end in `.png`.
//! PNG encoding/decoding is delegated to the `image` crate; QOI encoding/decoding is
//! delegated to `rapid_qoi`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use image::{DynamicImage, ImageFormat};
use rapid_qoi::Descriptor;

enum Format {
    Png,
    Qoi,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => Some(Format::Png),
        Some(ext) if ext.eq_ignore_ascii_case("qoi") => Some(Format::Qoi),
        _ => None,
    }
}

fn run(infile: PathBuf, outfile: PathBuf) -> Result<(), String> {
    let input_format =
        format_of(&infile).ok_or_else(|| format!("unsupported input extension: {}", infile.display()))?;
    let output_format = format_of(&outfile)
        .ok_or_else(|| format!("unsupported output extension: {}", outfile.display()))?;

    let image = match input_format {
        Format::Png => {
            log::debug!("reading PNG {}", infile.display());
            image::open(&infile).map_err(|err| format!("failed to read {}: {err}", infile.display()))?
        }
        Format::Qoi => {
            log::debug!("reading QOI {}", infile.display());
            let (pixels, descriptor) = rapid_qoi::file::read(&infile, 0)
                .map_err(|err| format!("failed to read {}: {err}", infile.display()))?;
            qoi_pixels_to_image(pixels, descriptor)?
        }
    };

    match output_format {
        Format::Png => {
            log::debug!("writing PNG {}", outfile.display());
            image
                .save_with_format(&outfile, ImageFormat::Png)
                .map_err(|err| format!("failed to write {}: {err}", outfile.display()))?;
        }
        Format::Qoi => {
            log::debug!("writing QOI {}", outfile.display());
            let (pixels, descriptor) = image_to_qoi_pixels(&image);
            rapid_qoi::file::write(&outfile, &pixels, &descriptor)
                .map_err(|err| format!("failed to write {}: {err}", outfile.display()))?;
        }
    }

    Ok(())
}

fn qoi_pixels_to_image(pixels: Vec<u8>, descriptor: Descriptor) -> Result<DynamicImage, String> {
    if descriptor.channels == 4 {
        image::RgbaImage::from_raw(descriptor.width, descriptor.height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "decoded QOI pixel buffer did not match its own header".to_string())
    } else {
        image::RgbImage::from_raw(descriptor.width, descriptor.height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "decoded QOI pixel buffer did not match its own header".to_string())
    }
}

fn image_to_qoi_pixels(image: &DynamicImage) -> (Vec<u8>, Descriptor) {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
            let rgb = image.to_rgb8();
            let descriptor = Descriptor {
                width: rgb.width(),
                height: rgb.height(),
                channels: 3,
                colorspace: 0,
            };
            (rgb.into_raw(), descriptor)
        }
        _ => {
            let rgba = image.to_rgba8();
            let descriptor = Descriptor {
                width: rgba.width(),
                height: rgba.height(),
                channels: 4,
                colorspace: 0,
            };
            (rgba.into_raw(), descriptor)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let (Some(infile), Some(outfile)) = (args.next(), args.next()) else {
        eprintln!("Usage: qoiconv <infile> <outfile>");
        return ExitCode::FAILURE;
    };

    match run(PathBuf::from(infile), PathBuf::from(outfile)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("qoiconv: {message}");
            ExitCode::FAILURE
        }
    }
}
