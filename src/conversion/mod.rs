//! Directory-level conversions between VOC XML and YOLO labels.
//!
//! Each driver walks one flat directory, converts file by file and records
//! what happened in a [`ConversionReport`]. A file that cannot be read or
//! parsed is recorded and skipped; only failures to write output abort the
//! run.

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use std::fs;
use std::path::Path;

use crate::config::ClassMap;
use crate::error::PrepError;
use crate::ir::image_size::{ImageSizeProvider, IMAGE_EXTENSIONS};
use crate::ir::io_voc_xml::{self, VOC_XML_EXTENSION};
use crate::ir::io_yolo::{self, LabelFormat, SkippedBox};
use crate::ir::layout::{collect_flat_files, file_name_of, stem_of};
use crate::ir::AnnotationRecord;

pub const VOC_FORMAT_NAME: &str = "voc-xml";

/// Convert every `*.xml` directly inside `xml_dir` into a label file in
/// `labels_dir`.
pub fn convert_voc_dir_to_yolo(
    xml_dir: &Path,
    labels_dir: &Path,
    classes: &ClassMap,
    format: LabelFormat,
) -> Result<ConversionReport, PrepError> {
    let mut report = ConversionReport::new(VOC_FORMAT_NAME, format.name());
    let xml_files = collect_flat_files(xml_dir, &[VOC_XML_EXTENSION])?;
    ensure_output_dir(labels_dir)?;

    for xml_path in &xml_files {
        report.counts.files_seen += 1;
        let source = file_name_of(xml_path);

        let record = match io_voc_xml::read_voc_file(xml_path) {
            Ok(record) => record,
            Err(err) => {
                record_failure(&mut report, &source, err);
                continue;
            }
        };

        warn_on_suspect_boxes(&source, &record);
        let encoded = io_yolo::encode_record(&record, classes, format);
        record_skips(&mut report, &source, "box", &encoded.skipped);

        let label_path = io_yolo::write_label_file(labels_dir, &record, &encoded.to_text())?;
        log::debug!("{} -> {}", xml_path.display(), label_path.display());

        report.counts.files_converted += 1;
        report.counts.boxes_written += encoded.lines.len();
    }

    log::info!(
        "voc2yolo: converted {}/{} file(s), {} box(es) written, {} skipped",
        report.counts.files_converted,
        report.counts.files_seen,
        report.counts.boxes_written,
        report.counts.boxes_skipped
    );
    Ok(report)
}

/// Rebuild one VOC document per image in `images_dir` from its label file in
/// `labels_dir`, writing the documents to `xml_dir`.
///
/// Images without a label file are skipped with a warning.
pub fn convert_yolo_dir_to_voc(
    images_dir: &Path,
    labels_dir: &Path,
    xml_dir: &Path,
    classes: &ClassMap,
    format: LabelFormat,
    sizes: &dyn ImageSizeProvider,
) -> Result<ConversionReport, PrepError> {
    let mut report = ConversionReport::new(format.name(), VOC_FORMAT_NAME);
    let images = collect_flat_files(images_dir, &IMAGE_EXTENSIONS)?;
    ensure_output_dir(xml_dir)?;

    for image_path in &images {
        report.counts.files_seen += 1;
        let image_name = file_name_of(image_path);
        let stem = stem_of(image_path);
        let label_path = labels_dir.join(io_yolo::label_file_name(&image_name));

        if !label_path.is_file() {
            let err = PrepError::MissingLabel {
                image_path: image_path.clone(),
                expected_stem: stem,
            };
            log::warn!("{err}");
            report.add(ConversionIssue::warning(
                ConversionIssueCode::MissingLabel,
                &image_name,
                err.to_string(),
            ));
            continue;
        }

        let size = match sizes.image_size(image_path) {
            Ok(size) => size,
            Err(err) => {
                record_failure(&mut report, &image_name, err);
                continue;
            }
        };
        let rows = match io_yolo::read_label_file(&label_path) {
            Ok(rows) => rows,
            Err(err) => {
                record_failure(&mut report, &image_name, err);
                continue;
            }
        };

        let decoded = io_yolo::decode_rows(&image_name, size, &rows, classes, format);
        record_skips(&mut report, &image_name, "line", &decoded.skipped);
        warn_on_suspect_boxes(&image_name, &decoded.record);

        let xml_path = io_voc_xml::write_voc_file(xml_dir, &decoded.record)?;
        log::debug!("{} -> {}", label_path.display(), xml_path.display());

        report.counts.files_converted += 1;
        report.counts.boxes_written += decoded.record.bboxes.len();
    }

    log::info!(
        "yolo2voc: converted {}/{} image(s), {} box(es) written, {} skipped",
        report.counts.files_converted,
        report.counts.files_seen,
        report.counts.boxes_written,
        report.counts.boxes_skipped
    );
    Ok(report)
}

fn ensure_output_dir(dir: &Path) -> Result<(), PrepError> {
    fs::create_dir_all(dir).map_err(|source| PrepError::UnwritableDestination {
        path: dir.to_path_buf(),
        source,
    })
}

// Suspect boxes are reported but still converted.
fn warn_on_suspect_boxes(source: &str, record: &AnnotationRecord) {
    let width = record.size.width as f64;
    let height = record.size.height as f64;
    for (index, object) in record.bboxes.iter().enumerate() {
        let bbox = &object.bbox;
        if !bbox.is_finite() || !bbox.is_ordered() || !bbox.is_within(width, height) {
            log::warn!(
                "{source}: box {index} ({}) {bbox:?} is degenerate or outside the {}x{} image",
                object.class,
                record.size.width,
                record.size.height
            );
        }
    }
}

fn record_failure(report: &mut ConversionReport, source: &str, err: PrepError) {
    log::error!("skipping {source}: {err}");
    report.counts.files_failed += 1;
    report.add(ConversionIssue::error(
        ConversionIssueCode::for_error(&err),
        source,
        err.to_string(),
    ));
}

fn record_skips(report: &mut ConversionReport, source: &str, unit: &str, skipped: &[SkippedBox]) {
    for skip in skipped {
        log::warn!("{source}: skipping {unit} {}: {}", skip.index, skip.error);
        report.counts.boxes_skipped += 1;
        report.add(ConversionIssue::warning(
            ConversionIssueCode::for_error(&skip.error),
            source,
            format!("{unit} {}: {}", skip.index, skip.error),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ImageSize;

    struct FixedSize(ImageSize);

    impl ImageSizeProvider for FixedSize {
        fn image_size(&self, _path: &Path) -> Result<ImageSize, PrepError> {
            Ok(self.0)
        }
    }

    const DRONE_XML: &str = "<annotation><filename>a.png</filename>\
        <size><width>640</width><height>480</height><depth>3</depth></size>\
        <object><name>DRONE</name><bndbox><xmin>100</xmin><ymin>50</ymin>\
        <xmax>300</xmax><ymax>250</ymax></bndbox></object>\
        <object><name>BALLOON</name><bndbox><xmin>1</xmin><ymin>1</ymin>\
        <xmax>2</xmax><ymax>2</ymax></bndbox></object></annotation>";

    #[test]
    fn voc_dir_conversion_isolates_bad_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let xml_dir = temp.path().join("xml");
        let labels_dir = temp.path().join("labels");
        fs::create_dir(&xml_dir).expect("mkdir");
        fs::write(xml_dir.join("a.xml"), DRONE_XML).expect("write xml");
        fs::write(xml_dir.join("b.xml"), "<annotation>").expect("write xml");

        let report = convert_voc_dir_to_yolo(
            &xml_dir,
            &labels_dir,
            &ClassMap::default(),
            LabelFormat::Normalized,
        )
        .expect("convert");

        assert_eq!(report.counts.files_seen, 2);
        assert_eq!(report.counts.files_converted, 1);
        assert_eq!(report.counts.files_failed, 1);
        assert_eq!(report.counts.boxes_written, 1);
        assert_eq!(report.counts.boxes_skipped, 1);
        assert_eq!(
            fs::read_to_string(labels_dir.join("a.txt")).expect("read label"),
            "2 0.312 0.312 0.312 0.417"
        );
        assert!(!labels_dir.join("b.txt").exists());
    }

    #[test]
    fn yolo_dir_conversion_uses_provider_and_skips_unlabelled_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images_dir = temp.path().join("images");
        let labels_dir = temp.path().join("labels");
        let xml_dir = temp.path().join("xml");
        fs::create_dir(&images_dir).expect("mkdir");
        fs::create_dir(&labels_dir).expect("mkdir");
        fs::write(images_dir.join("a.png"), b"").expect("write image");
        fs::write(images_dir.join("b.png"), b"").expect("write image");
        fs::write(labels_dir.join("a.txt"), "1 10 20 30 40\n").expect("write label");

        let report = convert_yolo_dir_to_voc(
            &images_dir,
            &labels_dir,
            &xml_dir,
            &ClassMap::default(),
            LabelFormat::AbsolutePixel,
            &FixedSize(ImageSize::new(100, 80, 3)),
        )
        .expect("convert");

        assert_eq!(report.counts.files_converted, 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.issues[0].code, ConversionIssueCode::MissingLabel);

        let record = io_voc_xml::read_voc_file(&xml_dir.join("a.xml")).expect("read xml");
        assert_eq!(record.filename, "a.png");
        assert_eq!(record.size, ImageSize::new(100, 80, 3));
        assert_eq!(record.bboxes[0].class, "BIRD");
        assert_eq!(record.bboxes[0].bbox.xmax(), 40.0);
        assert_eq!(record.bboxes[0].bbox.ymax(), 60.0);
        assert!(!xml_dir.join("b.xml").exists());
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let xml_dir = temp.path().join("xml");
        fs::create_dir(&xml_dir).expect("mkdir");
        fs::write(xml_dir.join("a.xml"), DRONE_XML).expect("write xml");
        let blocker = temp.path().join("labels");
        fs::write(&blocker, "not a directory").expect("write blocker");

        let err = convert_voc_dir_to_yolo(
            &xml_dir,
            &blocker,
            &ClassMap::default(),
            LabelFormat::Normalized,
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::UnwritableDestination { .. }));
    }
}
