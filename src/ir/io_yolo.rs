//! YOLO label files.
//!
//! A label file holds one row per box: `class_id a b c d`. Two on-disk
//! conventions exist in the corpora this crate handles, and both are
//! supported explicitly through [`LabelFormat`]:
//!
//! - [`LabelFormat::Normalized`]: `class_id cx cy w h`, fractions of the image
//!   size written with 3 decimals. This is what training consumes.
//! - [`LabelFormat::AbsolutePixel`]: `class_id xmin ymin w h` in pixels, as
//!   produced by some export tools.

use std::fs;
use std::path::{Path, PathBuf};

use super::model::{AnnotationRecord, BoundingBox, ImageSize};
use super::{BBoxXYXY, Normalized, Pixel};
use crate::config::ClassMap;
use crate::error::PrepError;

pub const LABEL_EXTENSION: &str = "txt";

/// Decimal places used for normalized fields.
pub const NORMALIZED_PRECISION: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LabelFormat {
    #[default]
    Normalized,
    AbsolutePixel,
}

impl LabelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            LabelFormat::Normalized => "yolo-normalized",
            LabelFormat::AbsolutePixel => "yolo-absolute",
        }
    }
}

/// One parsed label row; the meaning of the four numbers depends on the format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelRow {
    pub class_id: usize,
    pub values: [f64; 4],
}

/// A box left out of the output, with the reason.
#[derive(Debug)]
pub struct SkippedBox {
    /// Position of the box in the record, or the 1-based line in a label file.
    pub index: usize,
    pub error: PrepError,
}

/// Output of [`encode_record`].
#[derive(Debug, Default)]
pub struct EncodedLabels {
    pub lines: Vec<String>,
    pub skipped: Vec<SkippedBox>,
}

impl EncodedLabels {
    /// Lines joined by `\n` with no trailing newline.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Convert a record into label lines, one per box, in record order.
///
/// A box whose class is not in `classes` is skipped and reported in
/// [`EncodedLabels::skipped`]; the remaining boxes are still encoded.
pub fn encode_record(
    record: &AnnotationRecord,
    classes: &ClassMap,
    format: LabelFormat,
) -> EncodedLabels {
    let mut encoded = EncodedLabels::default();
    let width = record.size.width as f64;
    let height = record.size.height as f64;

    for (index, object) in record.bboxes.iter().enumerate() {
        let class_id = match classes.id_of(&object.class) {
            Ok(id) => id,
            Err(error) => {
                encoded.skipped.push(SkippedBox { index, error });
                continue;
            }
        };

        let line = match format {
            LabelFormat::Normalized => {
                let (cx, cy, w, h) = object.bbox.to_normalized(width, height).to_cxcywh();
                format!(
                    "{class_id} {cx:.prec$} {cy:.prec$} {w:.prec$} {h:.prec$}",
                    prec = NORMALIZED_PRECISION
                )
            }
            LabelFormat::AbsolutePixel => {
                let (x, y, w, h) = object.bbox.to_xywh();
                format!("{class_id} {x} {y} {w} {h}")
            }
        };
        encoded.lines.push(line);
    }

    encoded
}

/// Label file name for an image file name (`a.png` -> `a.txt`).
pub fn label_file_name(image_file_name: &str) -> PathBuf {
    Path::new(image_file_name).with_extension(LABEL_EXTENSION)
}

/// Write already-encoded label text for `record` into `dir`.
pub fn write_label_file(
    dir: &Path,
    record: &AnnotationRecord,
    text: &str,
) -> Result<PathBuf, PrepError> {
    let label_path = dir.join(record.sibling_file_name(LABEL_EXTENSION));
    fs::write(&label_path, text).map_err(|source| PrepError::UnwritableDestination {
        path: label_path.clone(),
        source,
    })?;
    Ok(label_path)
}

/// Parse every non-blank line of a label file.
pub fn parse_label_str(text: &str, path: &Path) -> Result<Vec<(usize, LabelRow)>, PrepError> {
    let mut rows = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let line_num = line_idx + 1;
        if let Some(row) = parse_label_line(line, path, line_num)? {
            rows.push((line_num, row));
        }
    }
    Ok(rows)
}

pub fn read_label_file(path: &Path) -> Result<Vec<(usize, LabelRow)>, PrepError> {
    let text = fs::read_to_string(path).map_err(PrepError::Io)?;
    parse_label_str(&text, path)
}

fn parse_label_line(
    line: &str,
    path: &Path,
    line_num: usize,
) -> Result<Option<LabelRow>, PrepError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // At most 6 tokens: enough to tell "too many" apart without unbounded allocation.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    if tokens.len() != 5 {
        return Err(PrepError::LabelParse {
            path: path.to_path_buf(),
            line: line_num,
            message: if tokens.len() > 5 {
                "more than 5 tokens; only bounding-box rows are supported".to_string()
            } else {
                format!("expected 5 tokens, found {}", tokens.len())
            },
        });
    }

    let class_id = tokens[0]
        .parse::<usize>()
        .map_err(|_| PrepError::LabelParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let mut values = [0.0; 4];
    for (slot, raw) in values.iter_mut().zip(&tokens[1..]) {
        *slot = raw.parse::<f64>().map_err(|_| PrepError::LabelParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("invalid value '{raw}'; expected floating-point number"),
        })?;
    }

    Ok(Some(LabelRow { class_id, values }))
}

/// Output of [`decode_rows`].
#[derive(Debug)]
pub struct DecodedLabels {
    pub record: AnnotationRecord,
    pub skipped: Vec<SkippedBox>,
}

/// Rebuild a pixel-space record from label rows and the image's size.
///
/// Rows whose class id has no name in `classes` are skipped and reported;
/// `SkippedBox::index` is the row's line number.
pub fn decode_rows(
    filename: &str,
    size: ImageSize,
    rows: &[(usize, LabelRow)],
    classes: &ClassMap,
    format: LabelFormat,
) -> DecodedLabels {
    let mut record = AnnotationRecord::new(filename, size);
    let mut skipped = Vec::new();
    let width = size.width as f64;
    let height = size.height as f64;

    for (line_num, row) in rows {
        let class = match classes.name_of(row.class_id) {
            Ok(name) => name.to_string(),
            Err(error) => {
                skipped.push(SkippedBox {
                    index: *line_num,
                    error,
                });
                continue;
            }
        };

        let [a, b, c, d] = row.values;
        let bbox: BBoxXYXY<Pixel> = match format {
            LabelFormat::Normalized => {
                BBoxXYXY::<Normalized>::from_cxcywh(a, b, c, d).to_pixel(width, height)
            }
            LabelFormat::AbsolutePixel => BBoxXYXY::from_xywh(a, b, c, d),
        };
        record.bboxes.push(BoundingBox::new(class, bbox));
    }

    DecodedLabels { record, skipped }
}
