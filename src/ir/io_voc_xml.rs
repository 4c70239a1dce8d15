//! Pascal VOC XML reader and writer.
//!
//! One XML document describes one image: its `filename`, a `size` block and
//! any number of `object` blocks with a `name` and a pixel-space `bndbox`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::model::{AnnotationRecord, BoundingBox, ImageSize};
use super::{BBoxXYXY, Pixel};
use crate::error::PrepError;

pub const VOC_XML_EXTENSION: &str = "xml";

/// Read and parse a single VOC XML file.
pub fn read_voc_file(path: &Path) -> Result<AnnotationRecord, PrepError> {
    let xml = fs::read_to_string(path).map_err(|source| PrepError::MalformedAnnotation {
        path: path.to_path_buf(),
        message: format!("cannot read file: {source}"),
    })?;
    parse_voc_xml_str(&xml, path)
}

/// Parse a VOC XML document held in memory.
///
/// `path` is only used to label errors.
pub fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<AnnotationRecord, PrepError> {
    let malformed = |message: String| PrepError::MalformedAnnotation {
        path: path.to_path_buf(),
        message,
    };

    let document = roxmltree::Document::parse(xml).map_err(|source| malformed(source.to_string()))?;

    let mut filename = None;
    let mut size = None;
    let mut bboxes = Vec::new();

    for node in document.root_element().children().filter(Node::is_element) {
        match node.tag_name().name() {
            "filename" => filename = Some(node_text(node).unwrap_or_default()),
            "size" => size = Some(parse_size(node, path)?),
            "object" => bboxes.push(parse_object(node, path)?),
            _ => {}
        }
    }

    let filename = filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("missing <filename>".to_string()))?;
    if Path::new(&filename).file_name().is_none() {
        return Err(malformed(format!("<filename> '{filename}' does not name a file")));
    }
    let size = size.ok_or_else(|| malformed("missing <size>".to_string()))?;

    Ok(AnnotationRecord {
        filename,
        size,
        bboxes,
    })
}

/// Parse VOC XML from raw bytes; the input must be UTF-8.
pub fn parse_voc_xml_slice(bytes: &[u8], path: &Path) -> Result<AnnotationRecord, PrepError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| PrepError::MalformedAnnotation {
        path: path.to_path_buf(),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_voc_xml_str(xml, path)
}

// Children are read positionally (width, height, depth) whatever their tag.
fn parse_size(size: Node<'_, '_>, path: &Path) -> Result<ImageSize, PrepError> {
    let mut dims = Vec::with_capacity(3);
    for child in size.children().filter(Node::is_element) {
        let raw = node_text(child).unwrap_or_default();
        let value = raw
            .parse::<u32>()
            .map_err(|_| PrepError::MalformedAnnotation {
                path: path.to_path_buf(),
                message: format!(
                    "invalid <{}> value '{raw}' in <size>; expected non-negative integer",
                    child.tag_name().name()
                ),
            })?;
        dims.push(value);
    }

    if dims.len() < 3 {
        return Err(PrepError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: format!("<size> has {} child element(s); expected 3", dims.len()),
        });
    }

    check_positive(ImageSize::new(dims[0], dims[1], dims[2]), path)
}

fn check_positive(size: ImageSize, path: &Path) -> Result<ImageSize, PrepError> {
    if size.width == 0 || size.height == 0 {
        return Err(PrepError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: format!(
                "image size {}x{} must be positive",
                size.width, size.height
            ),
        });
    }
    Ok(size)
}

fn parse_object(object: Node<'_, '_>, path: &Path) -> Result<BoundingBox, PrepError> {
    let malformed = |message: String| PrepError::MalformedAnnotation {
        path: path.to_path_buf(),
        message,
    };

    let class = child_element(object, "name")
        .and_then(node_text)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("missing <name> in <object>".to_string()))?;
    let bndbox = child_element(object, "bndbox")
        .ok_or_else(|| malformed(format!("missing <bndbox> in <object> '{class}'")))?;

    let mut fields: BTreeMap<&str, f64> = BTreeMap::new();
    for child in bndbox.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        let raw = node_text(child).unwrap_or_default();
        let value = raw.parse::<f64>().map_err(|_| {
            malformed(format!(
                "invalid <{tag}> value '{raw}' in <bndbox>; expected floating-point number"
            ))
        })?;
        fields.insert(tag, value);
    }

    let mut coord = |tag: &str| {
        fields
            .remove(tag)
            .ok_or_else(|| malformed(format!("missing <{tag}> in <bndbox> of '{class}'")))
    };
    let xmin = coord("xmin")?;
    let ymin = coord("ymin")?;
    let xmax = coord("xmax")?;
    let ymax = coord("ymax")?;

    Ok(BoundingBox::new(
        class,
        BBoxXYXY::<Pixel>::from_xyxy(xmin, ymin, xmax, ymax),
    ))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn node_text(node: Node<'_, '_>) -> Option<String> {
    node.text().map(str::trim).map(ToOwned::to_owned)
}

/// Render a record as a VOC XML document.
///
/// The `size` block is written once per document, ahead of the objects.
pub fn to_voc_xml_string(record: &AnnotationRecord) -> String {
    let mut xml = String::new();

    writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>").expect("write to string");
    writeln!(xml, "<annotation>").expect("write to string");
    writeln!(
        xml,
        "  <filename>{}</filename>",
        xml_escape(&record.filename)
    )
    .expect("write to string");
    writeln!(xml, "  <size>").expect("write to string");
    writeln!(xml, "    <width>{}</width>", record.size.width).expect("write to string");
    writeln!(xml, "    <height>{}</height>", record.size.height).expect("write to string");
    writeln!(xml, "    <depth>{}</depth>", record.size.depth).expect("write to string");
    writeln!(xml, "  </size>").expect("write to string");

    for object in &record.bboxes {
        writeln!(xml, "  <object>").expect("write to string");
        writeln!(xml, "    <name>{}</name>", xml_escape(&object.class)).expect("write to string");
        writeln!(xml, "    <bndbox>").expect("write to string");
        writeln!(xml, "      <xmin>{}</xmin>", object.bbox.xmin()).expect("write to string");
        writeln!(xml, "      <ymin>{}</ymin>", object.bbox.ymin()).expect("write to string");
        writeln!(xml, "      <xmax>{}</xmax>", object.bbox.xmax()).expect("write to string");
        writeln!(xml, "      <ymax>{}</ymax>", object.bbox.ymax()).expect("write to string");
        writeln!(xml, "    </bndbox>").expect("write to string");
        writeln!(xml, "  </object>").expect("write to string");
    }

    writeln!(xml, "</annotation>").expect("write to string");
    xml
}

/// Write `record` into `dir` as `<stem>.xml`, returning the written path.
pub fn write_voc_file(dir: &Path, record: &AnnotationRecord) -> Result<PathBuf, PrepError> {
    let xml_path = dir.join(record.sibling_file_name(VOC_XML_EXTENSION));
    fs::write(&xml_path, to_voc_xml_string(record)).map_err(|source| {
        PrepError::UnwritableDestination {
            path: xml_path.clone(),
            source,
        }
    })?;
    Ok(xml_path)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
