//! Restore the one-to-one pairing between images and label files.
//!
//! A label whose stem has no image, or an image whose stem has no label, is
//! an orphan. Orphans are reported and deleted so that training never sees
//! an unlabelled image or a label without pixels.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PrepError;
use crate::ir::image_size::IMAGE_EXTENSIONS;
use crate::ir::io_voc_xml::VOC_XML_EXTENSION;
use crate::ir::io_yolo::LABEL_EXTENSION;
use crate::ir::layout::{collect_flat_files, stem_of};

/// Extensions treated as labels when pairing.
pub const LABEL_EXTENSIONS: [&str; 2] = [LABEL_EXTENSION, VOC_XML_EXTENSION];

#[derive(Clone, Copy, Debug, Default)]
pub struct ReconcileOptions {
    /// Report orphans without deleting anything.
    pub dry_run: bool,
}

/// Files with no counterpart, in file-name order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Orphans {
    pub labels: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl Orphans {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.images.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub labels_seen: usize,
    pub images_seen: usize,
    pub orphans: Orphans,
    /// Number of files removed; zero on a dry run.
    pub removed: usize,
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Number of stems present on both sides after this run.
    pub fn matched(&self) -> usize {
        self.labels_seen - self.orphans.labels.len()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} labels, {} images, {} matched",
            self.labels_seen,
            self.images_seen,
            self.matched()
        )?;

        if self.orphans.is_empty() {
            return writeln!(f, "  no orphans found");
        }

        let verb = if self.dry_run { "would delete" } else { "deleted" };
        for (kind, paths) in [
            ("label", &self.orphans.labels),
            ("image", &self.orphans.images),
        ] {
            if paths.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "Orphan {kind}s ({}, {verb}):", paths.len())?;
            for path in paths {
                writeln!(f, "  - {}", path.display())?;
            }
        }
        Ok(())
    }
}

/// Compare label and image stems in two flat directories.
pub fn find_orphans(labels_dir: &Path, images_dir: &Path) -> Result<Orphans, PrepError> {
    let labels = collect_flat_files(labels_dir, &LABEL_EXTENSIONS)?;
    let images = collect_flat_files(images_dir, &IMAGE_EXTENSIONS)?;
    Ok(orphans_between(&labels, &images))
}

fn orphans_between(labels: &[PathBuf], images: &[PathBuf]) -> Orphans {
    let label_stems: BTreeSet<String> = labels.iter().map(|p| stem_of(p)).collect();
    let image_stems: BTreeSet<String> = images.iter().map(|p| stem_of(p)).collect();

    Orphans {
        labels: labels
            .iter()
            .filter(|p| !image_stems.contains(&stem_of(p)))
            .cloned()
            .collect(),
        images: images
            .iter()
            .filter(|p| !label_stems.contains(&stem_of(p)))
            .cloned()
            .collect(),
    }
}

/// Delete every orphan so that label stems equal image stems.
///
/// Running it on an already matched pair of directories changes nothing.
pub fn reconcile(
    labels_dir: &Path,
    images_dir: &Path,
    opts: &ReconcileOptions,
) -> Result<ReconcileReport, PrepError> {
    let labels = collect_flat_files(labels_dir, &LABEL_EXTENSIONS)?;
    let images = collect_flat_files(images_dir, &IMAGE_EXTENSIONS)?;
    let orphans = orphans_between(&labels, &images);

    let mut report = ReconcileReport {
        labels_seen: labels.len(),
        images_seen: images.len(),
        orphans,
        removed: 0,
        dry_run: opts.dry_run,
    };

    for path in &report.orphans.labels {
        log::warn!("no image for label {}", path.display());
    }
    for path in &report.orphans.images {
        log::warn!("no label for image {}", path.display());
    }

    if !opts.dry_run {
        report.removed = remove_orphans(
            report
                .orphans
                .labels
                .iter()
                .chain(report.orphans.images.iter()),
        )?;
    }

    log::info!(
        "reconcile: {} orphan label(s), {} orphan image(s){}",
        report.orphans.labels.len(),
        report.orphans.images.len(),
        if opts.dry_run { " (dry run)" } else { "" }
    );
    Ok(report)
}

// Stops at the first file that cannot be deleted.
fn remove_orphans<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<usize, PrepError> {
    let mut removed = 0;
    for path in paths {
        remove_orphan(path)?;
        removed += 1;
    }
    Ok(removed)
}

fn remove_orphan(path: &Path) -> Result<(), PrepError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("deleted {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} already gone", path.display());
            Ok(())
        }
        Err(source) => Err(PrepError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
