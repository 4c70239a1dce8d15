//! Image dimension lookup.
//!
//! Rebuilding a VOC document from YOLO labels needs each image's pixel size.
//! Callers supply it through [`ImageSizeProvider`]; the default
//! implementation reads only the file header via `imagesize`.

use std::path::Path;

use super::model::ImageSize;
use crate::error::PrepError;

/// Lowercase extensions treated as images throughout the crate.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];

pub trait ImageSizeProvider {
    fn image_size(&self, path: &Path) -> Result<ImageSize, PrepError>;
}

/// Probes width/height from the image header and reports a fixed depth.
#[derive(Clone, Copy, Debug)]
pub struct HeaderSizeProvider {
    depth: u32,
}

impl HeaderSizeProvider {
    pub fn new(depth: u32) -> Self {
        Self { depth }
    }
}

impl ImageSizeProvider for HeaderSizeProvider {
    fn image_size(&self, path: &Path) -> Result<ImageSize, PrepError> {
        let size = imagesize::size(path).map_err(|source| PrepError::ImageDimensionRead {
            path: path.to_path_buf(),
            source,
        })?;

        let width = to_dimension(size.width, path, "width")?;
        let height = to_dimension(size.height, path, "height")?;

        Ok(ImageSize::new(width, height, self.depth))
    }
}

fn to_dimension(raw: usize, path: &Path, axis: &str) -> Result<u32, PrepError> {
    match u32::try_from(raw) {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(PrepError::LayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image {axis} {raw} is not a positive u32"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
        let row_stride = (width * 3).div_ceil(4) * 4;
        let pixel_array_size = row_stride * height;
        let file_size = 54 + pixel_array_size;

        let mut bytes = Vec::with_capacity(file_size as usize);
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&file_size.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&54u32.to_le_bytes());
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&(width as i32).to_le_bytes());
        bytes.extend_from_slice(&(height as i32).to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
        bytes.extend_from_slice(&2835u32.to_le_bytes());
        bytes.extend_from_slice(&2835u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.resize(file_size as usize, 0);
        bytes
    }

    #[test]
    fn header_provider_reads_bmp_dimensions() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("frame.bmp");
        fs::write(&path, bmp_bytes(32, 24)).expect("write bmp");

        let size = HeaderSizeProvider::new(3)
            .image_size(&path)
            .expect("read size");
        assert_eq!(size, ImageSize::new(32, 24, 3));
    }

    #[test]
    fn header_provider_rejects_non_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("notes.png");
        fs::write(&path, b"not an image").expect("write junk");

        let err = HeaderSizeProvider::new(3).image_size(&path).unwrap_err();
        assert!(matches!(err, PrepError::ImageDimensionRead { .. }));
    }
}
