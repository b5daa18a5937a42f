use std::path::{Component, Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::{debug, info};

use super::super::class_map::ClassLabelMap;
use super::super::error::DatasetError;

struct AssignedImage {
    path: PathBuf,
    code: String,
}

/// Parse an annotation project export into a class map.
///
/// Each image takes the classification code with the highest value. Only
/// images present on disk are kept, and only taxons flagged `isClass` become
/// classes (sorted by code).
pub fn parse_xml(xml_path: &Path) -> Result<ClassLabelMap, DatasetError> {
    let text = std::fs::read_to_string(xml_path).map_err(|err| DatasetError::io(xml_path, err))?;
    let doc = Document::parse(&text).map_err(|source| DatasetError::Xml {
        path: xml_path.to_path_buf(),
        source,
    })?;
    let project = doc.root_element();
    let base_dir = xml_path.parent().unwrap_or_else(|| Path::new(""));

    let images = required_child(xml_path, project, "images")?;
    let mut assigned = Vec::new();
    let mut missing = 0usize;
    for image in images.descendants().filter(|n| n.has_tag_name("image")) {
        let source = required_child(xml_path, image, "source")?;
        let filename = required_text(xml_path, source, "filename")?;
        let path = resolve_image_path(base_dir, filename)
            .map_err(|err| DatasetError::io(filename, err))?;
        if !path.is_file() {
            missing += 1;
            continue;
        }
        let code = best_classification(xml_path, image)?;
        assigned.push(AssignedImage { path, code });
    }
    if missing > 0 {
        debug!("Skipped {missing} images missing from disk");
    }

    let taxons = required_child(xml_path, project, "taxons")?;
    let mut labels = Vec::new();
    for taxon in taxons.descendants().filter(|n| n.has_tag_name("taxon")) {
        if required_text(xml_path, taxon, "isClass")? == "true" {
            labels.push(required_text(xml_path, taxon, "code")?.to_string());
        }
    }
    labels.sort();
    labels.dedup();

    let mut filenames = ClassLabelMap::new();
    for label in labels {
        let files = assigned
            .iter()
            .filter(|image| image.code == label)
            .map(|image| image.path.clone())
            .collect();
        filenames.insert(label, files);
    }
    info!(
        "Parsed {} images into {} classes from {}",
        filenames.total_files(),
        filenames.len(),
        xml_path.display()
    );
    Ok(filenames)
}

/// Highest-valued classification code; the first one wins ties.
fn best_classification(xml_path: &Path, image: Node<'_, '_>) -> Result<String, DatasetError> {
    let classifications = required_child(xml_path, image, "classifications")?;
    let mut best: Option<(f64, &str)> = None;
    for entry in classifications
        .descendants()
        .filter(|n| n.has_tag_name("classification"))
    {
        let code = required_text(xml_path, entry, "code")?;
        let raw = required_text(xml_path, entry, "value")?;
        let value = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                DatasetError::format(
                    xml_path,
                    format!("classification value '{raw}' is not a finite number"),
                )
            })?;
        if best.is_none_or(|(top, _)| value > top) {
            best = Some((value, code));
        }
    }
    best.map(|(_, code)| code.to_string()).ok_or_else(|| {
        DatasetError::format(xml_path, "image has no classification entries")
    })
}

fn required_child<'a, 'input>(
    xml_path: &Path,
    node: Node<'a, 'input>,
    tag: &str,
) -> Result<Node<'a, 'input>, DatasetError> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .ok_or_else(|| {
            DatasetError::format(
                xml_path,
                format!("<{}> is missing <{tag}>", node.tag_name().name()),
            )
        })
}

fn required_text<'a>(
    xml_path: &Path,
    node: Node<'a, '_>,
    tag: &str,
) -> Result<&'a str, DatasetError> {
    required_child(xml_path, node, tag)?
        .text()
        .map(str::trim)
        .ok_or_else(|| DatasetError::format(xml_path, format!("<{tag}> has no text")))
}

fn resolve_image_path(base_dir: &Path, filename: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(filename);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(normalize_lexically(&std::path::absolute(base_dir.join(path))?))
}

/// Remove `.` and resolve `..` components without touching the file system.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
