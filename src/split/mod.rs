//! Reproducible train/val/test partitioning of a paired corpus.
//!
//! The split runs in two stages. A seeded shuffle of all indices holds out
//! `ceil(n * test_fraction)` items; a second shuffle, reseeded with the same
//! seed, carves `ceil(h * val_fraction)` of the held-out items into
//! validation. Everything else held out is test.
//!
//! Files are then moved into `train/`, `val/` and `test/` subdirectories next
//! to where they were found. Moves are irreversible; each one is logged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::config::{ClassMap, SplitConfig};
use crate::error::PrepError;
use crate::ir::image_size::IMAGE_EXTENSIONS;
use crate::ir::layout::{collect_flat_files, file_name_of, stem_of};
use crate::reconcile::LABEL_EXTENSIONS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    Train,
    Val,
    Test,
}

impl Subset {
    pub const ALL: [Subset; 3] = [Subset::Train, Subset::Val, Subset::Test];

    /// Subdirectory the subset's files are moved into.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Val => "val",
            Subset::Test => "test",
        }
    }
}

/// Items assigned to each subset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            train: Vec::new(),
            val: Vec::new(),
            test: Vec::new(),
        }
    }
}

impl<T> Partition<T> {
    pub fn get(&self, subset: Subset) -> &[T] {
        match subset {
            Subset::Train => &self.train,
            Subset::Val => &self.val,
            Subset::Test => &self.test,
        }
    }

    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item with its subset, train first.
    pub fn iter(&self) -> impl Iterator<Item = (Subset, &T)> {
        Subset::ALL
            .into_iter()
            .flat_map(move |subset| self.get(subset).iter().map(move |item| (subset, item)))
    }

    fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Partition<U> {
        Partition {
            train: self.train.iter().map(&mut f).collect(),
            val: self.val.iter().map(&mut f).collect(),
            test: self.test.iter().map(&mut f).collect(),
        }
    }
}

/// An image and the annotation file sharing its stem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePair {
    pub image: PathBuf,
    pub annotation: PathBuf,
}

/// Number of items a fraction claims out of `total`, rounded up.
pub fn fraction_count(total: usize, fraction: f64) -> usize {
    let count = (total as f64 * fraction).ceil() as usize;
    count.min(total)
}

/// Assign each of `0..n` to a subset. Indices are sorted within each subset.
///
/// The same `n` and config always give the same assignment.
pub fn partition_indices(n: usize, cfg: &SplitConfig) -> Result<Partition<usize>, PrepError> {
    cfg.validate()?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    indices.shuffle(&mut rng);

    let held_count = fraction_count(n, cfg.test_fraction);
    let mut train = indices.split_off(held_count);
    let mut held = indices;

    let (mut val, mut test) = if cfg.val_fraction > 0.0 {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        held.shuffle(&mut rng);
        let val_count = fraction_count(held.len(), cfg.val_fraction);
        let test = held.split_off(val_count);
        (held, test)
    } else {
        (Vec::new(), held)
    };

    train.sort_unstable();
    val.sort_unstable();
    test.sort_unstable();

    Ok(Partition { train, val, test })
}

/// Partition two stem-aligned lists with one shared index assignment.
pub fn partition_pairs(
    images: &[PathBuf],
    annotations: &[PathBuf],
    cfg: &SplitConfig,
) -> Result<Partition<FilePair>, PrepError> {
    let image_stems: BTreeSet<String> = images.iter().map(|p| stem_of(p)).collect();
    let annotation_stems: BTreeSet<String> = annotations.iter().map(|p| stem_of(p)).collect();
    let unpaired: Vec<&str> = image_stems
        .symmetric_difference(&annotation_stems)
        .map(String::as_str)
        .collect();

    if !unpaired.is_empty() || images.len() != annotations.len() {
        return Err(PrepError::PartitionMismatch {
            message: format!(
                "{} image(s) but {} annotation file(s); unpaired stem(s): {}. \
                 A file whose partner is already in train/, val/ or test/ belongs there too",
                images.len(),
                annotations.len(),
                unpaired.join(", ")
            ),
        });
    }

    // Equal stem sets can still misalign when one stem has two images.
    for (image, annotation) in images.iter().zip(annotations) {
        if stem_of(image) != stem_of(annotation) {
            return Err(PrepError::PartitionMismatch {
                message: format!(
                    "{} does not pair with {}",
                    image.display(),
                    annotation.display()
                ),
            });
        }
    }

    let indices = partition_indices(images.len(), cfg)?;
    Ok(indices.map(|&i| FilePair {
        image: images[i].clone(),
        annotation: annotations[i].clone(),
    }))
}

/// Outcome of moving files into subset directories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelocationCounts {
    pub moved: usize,
    /// Sources that were already at their destination from an earlier run.
    pub already_placed: usize,
}

/// Move every pair into `<dir>/<subset>/` under its own directory.
pub fn relocate(
    partition: &Partition<FilePair>,
    images_dir: &Path,
    annotations_dir: &Path,
) -> Result<RelocationCounts, PrepError> {
    let mut counts = RelocationCounts::default();

    for (subset, pair) in partition.iter() {
        for (source, dir) in [
            (&pair.image, images_dir),
            (&pair.annotation, annotations_dir),
        ] {
            if move_into(source, &dir.join(subset.dir_name()))? {
                counts.moved += 1;
            } else {
                counts.already_placed += 1;
            }
        }
    }

    Ok(counts)
}

// Returns false when the file was already moved by an earlier run.
fn move_into(source: &Path, target_dir: &Path) -> Result<bool, PrepError> {
    let target = target_dir.join(file_name_of(source));

    if !source.exists() && target.exists() {
        log::debug!("{} already in {}", target.display(), target_dir.display());
        return Ok(false);
    }

    let relocation_error = |source_err: io::Error| PrepError::RelocationError {
        from: source.to_path_buf(),
        to: target.clone(),
        source: source_err,
    };

    fs::create_dir_all(target_dir).map_err(relocation_error)?;
    fs::rename(source, &target).map_err(relocation_error)?;
    log::info!("moved {} -> {}", source.display(), target.display());
    Ok(true)
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SplitReport {
    pub images_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub moved: usize,
    pub already_placed: usize,
}

impl SplitReport {
    pub fn count(&self, subset: Subset) -> usize {
        match subset {
            Subset::Train => self.train,
            Subset::Val => self.val,
            Subset::Test => self.test,
        }
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.train + self.val + self.test == 0 {
            return writeln!(
                f,
                "  nothing to split in {} (already partitioned?)",
                self.images_dir.display()
            );
        }
        writeln!(
            f,
            "  train: {}, val: {}, test: {}",
            self.train, self.val, self.test
        )?;
        writeln!(f, "  {} file(s) moved", self.moved)
    }
}

/// Split the images and annotation files found directly inside the two
/// directories and move them into subset subdirectories.
///
/// Files already inside `train/`, `val/` or `test/` are not listed, so a
/// second run over a partitioned corpus moves nothing.
pub fn split_dataset(
    images_dir: &Path,
    annotations_dir: &Path,
    cfg: &SplitConfig,
) -> Result<SplitReport, PrepError> {
    cfg.validate()?;

    let images = collect_flat_files(images_dir, &IMAGE_EXTENSIONS)?;
    let annotations = collect_flat_files(annotations_dir, &LABEL_EXTENSIONS)?;
    let partition = partition_pairs(&images, &annotations, cfg)?;
    let counts = relocate(&partition, images_dir, annotations_dir)?;

    let report = SplitReport {
        images_dir: images_dir.to_path_buf(),
        annotations_dir: annotations_dir.to_path_buf(),
        train: partition.train.len(),
        val: partition.val.len(),
        test: partition.test.len(),
        moved: counts.moved,
        already_placed: counts.already_placed,
    };

    log::info!(
        "split: {} train, {} val, {} test (seed {})",
        report.train,
        report.val,
        report.test,
        cfg.seed
    );
    Ok(report)
}

#[derive(Serialize)]
struct DataYaml {
    path: String,
    train: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    val: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test: Option<String>,
    nc: usize,
    names: BTreeMap<usize, String>,
}

/// Write an Ultralytics-style dataset file describing a finished split.
///
/// Subset paths are relative to `root` when the images directory lies
/// under it. `val` and `test` are listed when their directory holds images,
/// whatever this run moved, so a rerun over a partitioned corpus rewrites
/// the same file.
pub fn write_data_yaml(
    path: &Path,
    root: &Path,
    classes: &ClassMap,
    report: &SplitReport,
) -> Result<(), PrepError> {
    let images_rel = report
        .images_dir
        .strip_prefix(root)
        .unwrap_or(&report.images_dir);
    let subset_path = |subset: Subset| {
        let dir = images_rel.join(subset.dir_name());
        dir.to_string_lossy().replace('\\', "/")
    };
    let listed = |subset: Subset| -> Result<Option<String>, PrepError> {
        let populated = subset_has_images(&report.images_dir.join(subset.dir_name()))?;
        Ok(populated.then(|| subset_path(subset)))
    };

    let data = DataYaml {
        path: root.to_string_lossy().into_owned(),
        train: subset_path(Subset::Train),
        val: listed(Subset::Val)?,
        test: listed(Subset::Test)?,
        nc: classes.len(),
        names: classes.names().iter().cloned().enumerate().collect(),
    };

    let yaml = serde_yaml::to_string(&data).map_err(|err| PrepError::InvalidConfig {
        message: format!("cannot serialize dataset file: {err}"),
    })?;
    fs::write(path, yaml).map_err(|source| PrepError::UnwritableDestination {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn subset_has_images(dir: &Path) -> Result<bool, PrepError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(!collect_flat_files(dir, &IMAGE_EXTENSIONS)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(test_fraction: f64, val_fraction: f64, seed: u64) -> SplitConfig {
        SplitConfig {
            test_fraction,
            val_fraction,
            seed,
        }
    }

    #[test]
    fn counts_follow_two_stage_ceiling() {
        let p = partition_indices(100, &cfg(0.3, 0.5, 1)).expect("partition");
        assert_eq!((p.train.len(), p.val.len(), p.test.len()), (70, 15, 15));

        let p = partition_indices(7, &cfg(0.3, 0.5, 1)).expect("partition");
        assert_eq!((p.train.len(), p.val.len(), p.test.len()), (4, 2, 1));
    }

    #[test]
    fn every_index_lands_in_exactly_one_subset() {
        let p = partition_indices(53, &cfg(0.2, 0.5, 42)).expect("partition");
        let mut all: Vec<usize> = p.iter().map(|(_, &i)| i).collect();
        all.sort_unstable();
        assert_eq!(all, (0..53).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_assignment() {
        let a = partition_indices(40, &cfg(0.25, 0.5, 9)).expect("partition");
        let b = partition_indices(40, &cfg(0.25, 0.5, 9)).expect("partition");
        assert_eq!(a, b);
    }

    #[test]
    fn zero_val_fraction_sends_held_out_to_test() {
        let p = partition_indices(10, &cfg(0.2, 0.0, 1)).expect("partition");
        assert!(p.val.is_empty());
        assert_eq!(p.test.len(), 2);
        assert_eq!(p.train.len(), 8);
    }

    #[test]
    fn empty_input_gives_empty_partition() {
        let p = partition_indices(0, &SplitConfig::default()).expect("partition");
        assert!(p.is_empty());
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let err = partition_indices(10, &cfg(1.0, 0.5, 1)).unwrap_err();
        assert!(matches!(err, PrepError::InvalidSplitParams { .. }));
    }

    #[test]
    fn pairs_must_share_stems() {
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let labels = vec![PathBuf::from("a.txt"), PathBuf::from("c.txt")];
        let err = partition_pairs(&images, &labels, &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, PrepError::PartitionMismatch { .. }));

        let err = partition_pairs(&images, &labels[..1], &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, PrepError::PartitionMismatch { .. }));
    }

    #[test]
    fn pairs_move_in_lock_step() {
        let images: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i:02}.png"))).collect();
        let labels: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i:02}.txt"))).collect();
        let p = partition_pairs(&images, &labels, &SplitConfig::default()).expect("partition");
        for (_, pair) in p.iter() {
            assert_eq!(stem_of(&pair.image), stem_of(&pair.annotation));
        }
        assert_eq!(p.len(), 20);
    }

    #[test]
    fn data_yaml_lists_relative_subsets_and_names() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for subset in ["train", "test"] {
            let dir = temp.path().join("images").join(subset);
            fs::create_dir_all(&dir).expect("mkdir");
            fs::write(dir.join("a.png"), b"").expect("write image");
        }
        fs::create_dir_all(temp.path().join("images").join("val")).expect("mkdir");
        let report = SplitReport {
            images_dir: temp.path().join("images"),
            annotations_dir: temp.path().join("labels"),
            train: 8,
            val: 0,
            test: 2,
            ..Default::default()
        };
        let yaml_path = temp.path().join("data.yaml");
        write_data_yaml(&yaml_path, temp.path(), &ClassMap::default(), &report)
            .expect("write yaml");

        let raw = fs::read_to_string(&yaml_path).expect("read yaml");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&raw).expect("parse yaml");
        assert_eq!(parsed["train"].as_str(), Some("images/train"));
        assert_eq!(parsed["test"].as_str(), Some("images/test"));
        assert!(parsed.get("val").is_none());
        assert_eq!(parsed["nc"].as_u64(), Some(4));
        assert_eq!(parsed["names"][2].as_str(), Some("DRONE"));
    }
}
