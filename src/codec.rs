use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::error::{Error, Result};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Owned decode/encode context for scans and crops.
///
/// Constructed once by the caller and handed to whatever reads or writes
/// images; there is no process-wide codec state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    jpeg_quality: u8,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageCodec {
    pub fn new(jpeg_quality: u8) -> Result<Self> {
        if !(1..=100).contains(&jpeg_quality) {
            return Err(Error::InvalidConfig(format!(
                "JPEG quality must be within 1..=100, got {}",
                jpeg_quality
            )));
        }
        Ok(Self { jpeg_quality })
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Decode a scan; the format is sniffed from content, not the extension
    pub fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let reader = ImageReader::open(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = reader.with_guessed_format().map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        reader.decode().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn encode_jpeg(&self, img: &RgbImage, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| Error::io(format!("Failed to create {:?}", path), e))?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
        img.write_with_encoder(encoder).map_err(|source| Error::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        // Dropping a BufWriter swallows the final write error
        writer
            .flush()
            .map_err(|e| Error::io(format!("Failed to write {:?}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use uuid::Uuid;

    #[test]
    fn test_rejects_bad_quality() {
        assert!(ImageCodec::new(0).is_err());
        assert!(ImageCodec::new(101).is_err());
        assert_eq!(ImageCodec::new(80).unwrap().jpeg_quality(), 80);
    }

    #[test]
    fn test_jpeg_written_and_read_back() {
        let path = std::env::temp_dir().join(format!("codec-{}.jpg", Uuid::new_v4()));
        let codec = ImageCodec::default();
        let img = RgbImage::from_pixel(32, 16, Rgb([90, 90, 90]));

        codec.encode_jpeg(&img, &path).unwrap();
        let decoded = codec.decode(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_write_failure_is_reported() {
        // Every write to /dev/full fails with "no space left on device"
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let img = RgbImage::from_pixel(16, 16, Rgb([10, 200, 10]));
        assert!(ImageCodec::default().encode_jpeg(&img, full).is_err());
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let path = std::env::temp_dir().join(format!("missing-{}.jpg", Uuid::new_v4()));
        let err = ImageCodec::default().decode(&path).unwrap_err();
        assert!(err.is_unreadable_input());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let path = std::env::temp_dir().join(format!("garbage-{}.jpeg", Uuid::new_v4()));
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = ImageCodec::default().decode(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, Error::Decode { .. }));
    }
}
