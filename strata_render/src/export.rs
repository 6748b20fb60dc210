// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File export: format selection and encoding.
//!
//! PNG and TIFF keep the alpha channel. GIF keeps binary transparency. JPEG
//! has no alpha, so images are flattened over opaque white first.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use strata_core::image::Image;
use tiff::encoder::{TiffEncoder, colortype, compression::Lzw};

use crate::backend::BackendError;

/// Output file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Portable Network Graphics.
    Png,
    /// Graphics Interchange Format.
    Gif,
    /// JPEG, flattened over white.
    Jpeg,
    /// Tagged Image File Format.
    Tiff,
}

impl ExportFormat {
    /// Infers the format from a file extension, ignoring case.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Infers the format from the extension of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// Canonical file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
            Self::Tiff => "tiff",
        }
    }
}

/// How TIFF files are written.
///
/// LZW compression and CMYK conversion cannot be combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TiffMode {
    /// Uncompressed RGBA.
    #[default]
    Rgba,
    /// LZW-compressed RGBA.
    Lzw,
    /// Uncompressed CMYK, alpha dropped.
    Cmyk,
}

/// Export settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    /// Explicit format; inferred from the path when `None`.
    pub format: Option<ExportFormat>,
    /// JPEG quality in `[0, 1]`.
    pub jpeg_quality: f64,
    /// TIFF layout.
    pub tiff: TiffMode,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            jpeg_quality: 1.0,
            tiff: TiffMode::Rgba,
        }
    }
}

impl ExportOptions {
    /// Default options: format from the path, best JPEG quality, plain RGBA
    /// TIFF.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces a format.
    #[must_use]
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets JPEG compression in `[0, 1]`; quality is `1 - compression`.
    #[must_use]
    pub fn compression(mut self, compression: f64) -> Self {
        let c = if compression.is_nan() { 0.0 } else { compression.clamp(0.0, 1.0) };
        self.jpeg_quality = 1.0 - c;
        self
    }

    /// Sets the TIFF layout.
    #[must_use]
    pub fn tiff(mut self, mode: TiffMode) -> Self {
        self.tiff = mode;
        self
    }

    /// The explicit format, or the one implied by `path`.
    ///
    /// # Errors
    ///
    /// When neither is available.
    pub fn resolve_format(&self, path: &Path) -> Result<ExportFormat, BackendError> {
        self.format
            .or_else(|| ExportFormat::from_path(path))
            .ok_or_else(|| {
                BackendError::new(
                    "export",
                    format!("cannot infer an image format from {}", path.display()),
                )
            })
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "quality is clamped to [1, 100] before the cast"
    )]
    fn jpeg_quality_percent(&self) -> u8 {
        let q = if self.jpeg_quality.is_nan() { 1.0 } else { self.jpeg_quality };
        (q * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Encodes `image` and writes it to `path`, returning the file size.
///
/// # Errors
///
/// On encoder or I/O failure.
pub fn write_file(
    image: &Image,
    path: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<u64, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    encode(image, format, options, &mut buf)?;
    let bytes = buf.into_inner();
    std::fs::write(path, &bytes)
        .map_err(|e| BackendError::new("export", format!("{}: {e}", path.display())))?;
    Ok(bytes.len() as u64)
}

/// Encodes `image` into `out`.
///
/// # Errors
///
/// On encoder failure or an empty image.
pub fn encode<W: Write + Seek>(
    image: &Image,
    format: ExportFormat,
    options: &ExportOptions,
    out: &mut W,
) -> Result<(), BackendError> {
    if image.is_empty() {
        return Err(BackendError::new("export", "image has no pixels"));
    }
    let (w, h) = (image.width(), image.height());
    let codec = |e: image::ImageError| BackendError::new("export", e.to_string());
    match format {
        ExportFormat::Png => PngEncoder::new(out)
            .write_image(image.data(), w, h, ExtendedColorType::Rgba8)
            .map_err(codec),
        ExportFormat::Gif => GifEncoder::new(out)
            .encode(image.data(), w, h, ExtendedColorType::Rgba8)
            .map_err(codec),
        ExportFormat::Jpeg => JpegEncoder::new_with_quality(out, options.jpeg_quality_percent())
            .write_image(&flatten_over_white(image), w, h, ExtendedColorType::Rgb8)
            .map_err(codec),
        ExportFormat::Tiff => encode_tiff(image, options.tiff, out),
    }
}

fn encode_tiff<W: Write + Seek>(
    image: &Image,
    mode: TiffMode,
    out: &mut W,
) -> Result<(), BackendError> {
    let tiff = |e: tiff::TiffError| BackendError::new("export", e.to_string());
    let (w, h) = (image.width(), image.height());
    let mut encoder = TiffEncoder::new(out).map_err(tiff)?;
    match mode {
        TiffMode::Rgba => encoder.write_image::<colortype::RGBA8>(w, h, image.data()),
        TiffMode::Lzw => encoder.write_image_with_compression::<colortype::RGBA8, _>(
            w,
            h,
            Lzw::default(),
            image.data(),
        ),
        TiffMode::Cmyk => encoder.write_image::<colortype::CMYK8>(w, h, &to_cmyk(image)),
    }
    .map_err(tiff)
}

/// Straight RGBA to opaque RGB over white.
fn flatten_over_white(image: &Image) -> Vec<u8> {
    let px: &[[u8; 4]] = bytemuck::cast_slice(image.data());
    let mut out = Vec::with_capacity(px.len() * 3);
    for &[r, g, b, a] in px {
        let a = u32::from(a);
        for c in [r, g, b] {
            let v = (u32::from(c) * a + 255 * (255 - a) + 127) / 255;
            out.push(u8::try_from(v).unwrap_or(u8::MAX));
        }
    }
    out
}

/// Naive device-independent RGB to CMYK; alpha is ignored.
fn to_cmyk(image: &Image) -> Vec<u8> {
    let px: &[[u8; 4]] = bytemuck::cast_slice(image.data());
    let mut out = Vec::with_capacity(px.len() * 4);
    for &[r, g, b, _] in px {
        let k = 255 - r.max(g).max(b);
        if k == 255 {
            out.extend_from_slice(&[0, 0, 0, 255]);
            continue;
        }
        let inv_k = u32::from(255 - k);
        let ink = |c: u8| {
            let v = (inv_k - u32::from(c)) * 255 / inv_k;
            u8::try_from(v).unwrap_or(u8::MAX)
        };
        out.extend_from_slice(&[ink(r), ink(g), ink(b), k]);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use strata_core::color::Color;

    use super::*;

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/a.PNG")),
            Some(ExportFormat::Png)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("a.jpeg")),
            Some(ExportFormat::Jpeg)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("a.tif")),
            Some(ExportFormat::Tiff)
        );
        assert_eq!(ExportFormat::from_path(Path::new("a.bmp")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn explicit_format_wins_over_extension() {
        let o = ExportOptions::new().format(ExportFormat::Gif);
        assert_eq!(o.resolve_format(Path::new("a.png")), Ok(ExportFormat::Gif));
        assert!(ExportOptions::new().resolve_format(Path::new("a")).is_err());
    }

    #[test]
    fn compression_maps_to_quality() {
        let o = ExportOptions::new().compression(0.25);
        assert_eq!(o.jpeg_quality_percent(), 75);
        let o = ExportOptions::new().compression(7.0);
        assert_eq!(o.jpeg_quality_percent(), 1);
        assert_eq!(ExportOptions::new().jpeg_quality_percent(), 100);
    }

    #[test]
    fn jpeg_background_is_white() {
        let mut img = Image::new(2, 1);
        img.set_pixel(1, 0, [0, 0, 0, 255]);
        assert_eq!(flatten_over_white(&img), vec![255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn cmyk_of_primaries() {
        let mut img = Image::new(3, 1);
        img.set_pixel(0, 0, [255, 0, 0, 255]);
        img.set_pixel(1, 0, [0, 0, 0, 255]);
        img.set_pixel(2, 0, [255, 255, 255, 255]);
        assert_eq!(
            to_cmyk(&img),
            vec![0, 255, 255, 0, 0, 0, 0, 255, 0, 0, 0, 0]
        );
    }

    #[test]
    fn every_format_encodes() {
        let img = Image::filled(4, 3, Color::rgba(0.2, 0.4, 0.6, 0.5));
        for (format, tiff) in [
            (ExportFormat::Png, TiffMode::Rgba),
            (ExportFormat::Gif, TiffMode::Rgba),
            (ExportFormat::Jpeg, TiffMode::Rgba),
            (ExportFormat::Tiff, TiffMode::Rgba),
            (ExportFormat::Tiff, TiffMode::Lzw),
            (ExportFormat::Tiff, TiffMode::Cmyk),
        ] {
            let mut buf = Cursor::new(Vec::new());
            encode(&img, format, &ExportOptions::new().tiff(tiff), &mut buf).unwrap();
            assert!(!buf.into_inner().is_empty(), "{format:?} {tiff:?}");
        }
    }

    #[test]
    fn png_round_trips_through_the_decoder() {
        let mut img = Image::new(3, 2);
        img.set_pixel(2, 1, [10, 20, 30, 40]);
        let path: PathBuf = std::env::temp_dir().join("strata_export_round_trip.png");
        let written = write_file(&img, &path, ExportFormat::Png, &ExportOptions::new()).unwrap();
        assert!(written > 0);
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), img.data());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_images_are_rejected() {
        let mut buf = Cursor::new(Vec::new());
        let err = encode(
            &Image::new(0, 5),
            ExportFormat::Png,
            &ExportOptions::new(),
            &mut buf,
        )
        .unwrap_err();
        assert_eq!(err.operation, "export");
    }
}
