#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use yoloprep::config::DEFAULT_CLASS_NAMES;
use yoloprep::ir::{AnnotationRecord, BBoxXYXY, BoundingBox, ImageSize, Pixel};

pub const EPS_VOC: f64 = 1e-9;

/// Pixel tolerance after a trip through 3-decimal normalized labels.
///
/// Each field may be off by half a unit in the last place; a corner combines
/// a centre and half a size.
pub fn eps_normalized(size: ImageSize) -> f64 {
    size.width.max(size.height) as f64 * 1e-3
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_size() -> BoxedStrategy<ImageSize> {
    (2u32..4096, 2u32..4096)
        .prop_map(|(width, height)| ImageSize::new(width, height, 3))
        .boxed()
}

pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    prop::num::u32::ANY
        .prop_map(move |seed| {
            bbox_from_seed(
                width,
                height,
                seed,
                seed.rotate_left(3),
                seed.rotate_left(7),
                seed.rotate_left(11),
            )
        })
        .boxed()
}

/// Records whose classes all come from the default mapping.
pub fn arb_record(max_boxes: usize) -> BoxedStrategy<AnnotationRecord> {
    (image_file_name_strategy(), arb_image_size())
        .prop_flat_map(move |(filename, size)| {
            let object = (
                0..DEFAULT_CLASS_NAMES.len(),
                arb_bbox_within(size.width, size.height),
            );
            prop::collection::vec(object, 0..=max_boxes).prop_map(move |objects| {
                objects.into_iter().fold(
                    AnnotationRecord::new(filename.clone(), size),
                    |record, (class_idx, bbox)| {
                        record.with_bbox(BoundingBox::new(DEFAULT_CLASS_NAMES[class_idx], bbox))
                    },
                )
            })
        })
        .boxed()
}

pub fn assert_records_equivalent(
    a: &AnnotationRecord,
    b: &AnnotationRecord,
    eps: f64,
) -> Result<(), String> {
    if a.filename != b.filename {
        return Err(format!("filename {} != {}", a.filename, b.filename));
    }
    if a.bboxes.len() != b.bboxes.len() {
        return Err(format!(
            "box count {} != {}",
            a.bboxes.len(),
            b.bboxes.len()
        ));
    }

    for (idx, (left, right)) in a.bboxes.iter().zip(&b.bboxes).enumerate() {
        if left.class != right.class {
            return Err(format!("box {idx}: class {} != {}", left.class, right.class));
        }
        let l = &left.bbox;
        let r = &right.bbox;
        let close = (l.xmin() - r.xmin()).abs() <= eps
            && (l.ymin() - r.ymin()).abs() <= eps
            && (l.xmax() - r.xmax()).abs() <= eps
            && (l.ymax() - r.ymax()).abs() <= eps;
        if !close {
            return Err(format!("box {idx}: {l:?} vs {r:?} (eps {eps})"));
        }
    }

    Ok(())
}

fn image_file_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z0-9_]{1,12}\\.png")
        .expect("valid filename regex")
        .boxed()
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}
