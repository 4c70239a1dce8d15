//! Per-image annotation record.
//!
//! A record is built fresh from one source file (a VOC XML document, or a
//! YOLO label file plus the image's size), converted once and dropped.

use std::path::{Path, PathBuf};

use super::bbox::BBoxXYXY;
use super::space::Pixel;

/// Image dimensions as `(width, height, depth)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    /// Channel count. Carried through conversions, never used to normalize.
    pub depth: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// One labelled box in pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    /// Category label, checked against the class mapping only when encoding.
    pub class: String,
    pub bbox: BBoxXYXY<Pixel>,
}

impl BoundingBox {
    pub fn new(class: impl Into<String>, bbox: BBoxXYXY<Pixel>) -> Self {
        Self {
            class: class.into(),
            bbox,
        }
    }
}

/// All boxes of a single image.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRecord {
    /// Image file name; its stem ties the image to its label file.
    pub filename: String,
    pub size: ImageSize,
    /// Boxes in source order.
    pub bboxes: Vec<BoundingBox>,
}

impl AnnotationRecord {
    pub fn new(filename: impl Into<String>, size: ImageSize) -> Self {
        Self {
            filename: filename.into(),
            size,
            bboxes: Vec::new(),
        }
    }

    /// Appends a box, keeping insertion order.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bboxes.push(bbox);
        self
    }

    /// The last component of the filename with its extension swapped, e.g.
    /// `a.png` -> `a.txt`. Any directory part is dropped, so the result can
    /// always be joined onto an output directory.
    pub fn sibling_file_name(&self, extension: &str) -> PathBuf {
        let name = Path::new(&self.filename).file_name().unwrap_or_default();
        Path::new(name).with_extension(extension)
    }
}
