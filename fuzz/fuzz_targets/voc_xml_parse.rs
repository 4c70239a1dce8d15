//! Fuzz target for VOC XML parsing.
//!
//! Feeds arbitrary bytes to the VOC XML parser and, when a record comes
//! back, checks that rendering and re-parsing it does not panic either.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use yoloprep::ir::io_voc_xml::{parse_voc_xml_slice, parse_voc_xml_str, to_voc_xml_string};

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let path = Path::new("fuzz.xml");
    if let Ok(record) = parse_voc_xml_slice(data, path) {
        let _ = parse_voc_xml_str(&to_voc_xml_string(&record), path);
    }
});
