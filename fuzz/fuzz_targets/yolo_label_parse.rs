//! Fuzz target for YOLO label file parsing and decoding.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use yoloprep::config::ClassMap;
use yoloprep::ir::io_yolo::{decode_rows, parse_label_str};
use yoloprep::ir::{ImageSize, LabelFormat};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(rows) = parse_label_str(text, Path::new("fuzz.txt")) else {
        return;
    };

    let classes = ClassMap::default();
    let size = ImageSize::new(640, 480, 3);
    for format in [LabelFormat::Normalized, LabelFormat::AbsolutePixel] {
        let _ = decode_rows("fuzz.png", size, &rows, &classes, format);
    }
});
