//! Intermediate representation shared by the VOC and YOLO codecs.
//!
//! Every conversion goes through an [`AnnotationRecord`]: one image, its
//! size, and its boxes in pixel space. Pixel and normalized boxes are
//! distinct types, so a normalized value cannot be written where a pixel
//! value is expected.
//!
//! ```
//! use yoloprep::ir::{AnnotationRecord, BBoxXYXY, BoundingBox, ImageSize};
//!
//! let record = AnnotationRecord::new("frame.png", ImageSize::new(640, 480, 3))
//!     .with_bbox(BoundingBox::new(
//!         "DRONE",
//!         BBoxXYXY::from_xyxy(100.0, 50.0, 300.0, 250.0),
//!     ));
//! assert_eq!(record.bboxes.len(), 1);
//! ```

mod bbox;
pub mod image_size;
pub mod io_voc_xml;
pub mod io_yolo;
pub mod layout;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use image_size::{HeaderSizeProvider, ImageSizeProvider};
pub use io_yolo::LabelFormat;
pub use model::{AnnotationRecord, BoundingBox, ImageSize};
pub use space::{Normalized, Pixel};
