//! Run configuration: class mapping, split fractions and image depth.
//!
//! A [`PrepConfig`] is built once (from defaults or a YAML file) and passed
//! by reference to every component. Nothing here is global.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PrepError;

/// Class labels of the aerial-object corpus, in id order.
pub const DEFAULT_CLASS_NAMES: [&str; 4] = ["AIRPLANE", "BIRD", "DRONE", "HELICOPTER"];

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_VAL_FRACTION: f64 = 0.5;
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_IMAGE_DEPTH: u32 = 3;

/// Bijection between category labels and ids `0..len`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMap {
    names: Vec<String>,
    ids: BTreeMap<String, usize>,
}

impl ClassMap {
    /// Builds a mapping where each name's id is its position.
    ///
    /// Empty or duplicated names are rejected, since either would break the
    /// label <-> id bijection.
    pub fn new<I, S>(names: I) -> Result<Self, PrepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut ids = BTreeMap::new();

        for (id, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PrepError::InvalidConfig {
                    message: format!("class id {id} has an empty name"),
                });
            }
            if let Some(previous) = ids.insert(name.clone(), id) {
                return Err(PrepError::InvalidConfig {
                    message: format!("class '{name}' is listed twice (ids {previous} and {id})"),
                });
            }
        }

        Ok(Self { names, ids })
    }

    pub fn id_of(&self, name: &str) -> Result<usize, PrepError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| PrepError::UnknownClass {
                name: name.to_string(),
            })
    }

    pub fn name_of(&self, id: usize) -> Result<&str, PrepError> {
        self.names
            .get(id)
            .map(String::as_str)
            .ok_or(PrepError::UnknownClassId {
                id,
                class_count: self.names.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ClassMap {
    fn default() -> Self {
        let names: Vec<String> = DEFAULT_CLASS_NAMES.iter().map(|n| n.to_string()).collect();
        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect();
        Self { names, ids }
    }
}

/// Fractions and seed for the two-stage train/val/test split.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Share of the whole corpus held out from training.
    pub test_fraction: f64,
    /// Share of the held-out part that becomes validation; `0` disables val.
    pub val_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            val_fraction: DEFAULT_VAL_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl SplitConfig {
    /// Both fractions must lie in `[0, 1)`.
    pub fn validate(&self) -> Result<(), PrepError> {
        for (flag, value) in [
            ("test_fraction", self.test_fraction),
            ("val_fraction", self.val_fraction),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(PrepError::InvalidSplitParams {
                    message: format!("{flag} must be in the interval [0.0, 1.0), got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Immutable configuration shared by every stage of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct PrepConfig {
    pub classes: ClassMap,
    pub split: SplitConfig,
    /// Depth written to reconstructed XML; header probing cannot report it.
    pub image_depth: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    names: Option<ConfigNames>,
    #[serde(default)]
    split: Option<SplitConfig>,
    #[serde(default)]
    image_depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

impl PrepConfig {
    pub fn new(classes: ClassMap, split: SplitConfig) -> Self {
        Self {
            classes,
            split,
            image_depth: DEFAULT_IMAGE_DEPTH,
        }
    }

    /// Loads a YAML configuration file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, PrepError> {
        let raw = fs::read_to_string(path).map_err(PrepError::Io)?;
        Self::from_yaml_str(&raw, path)
    }

    pub fn from_yaml_str(raw: &str, path: &Path) -> Result<Self, PrepError> {
        let parsed: ConfigFile = if raw.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(raw).map_err(|source| PrepError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let classes = match parsed.names {
            None => ClassMap::default(),
            Some(ConfigNames::Sequence(names)) => ClassMap::new(names)?,
            Some(ConfigNames::Mapping(mapping)) => ClassMap::new(dense_names(mapping)?)?,
        };

        let split = parsed.split.unwrap_or_default();
        split.validate()?;

        let image_depth = parsed.image_depth.unwrap_or(DEFAULT_IMAGE_DEPTH);
        if image_depth == 0 {
            return Err(PrepError::InvalidConfig {
                message: "image_depth must be positive".to_string(),
            });
        }

        Ok(Self {
            classes,
            split,
            image_depth,
        })
    }

    /// Returns a copy with the split settings replaced.
    pub fn with_split(mut self, split: SplitConfig) -> Result<Self, PrepError> {
        split.validate()?;
        self.split = split;
        Ok(self)
    }
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self::new(ClassMap::default(), SplitConfig::default())
    }
}

// `{0: a, 1: b}` style maps must cover every id from 0 without gaps.
fn dense_names(mapping: BTreeMap<usize, String>) -> Result<Vec<String>, PrepError> {
    let mut names = Vec::with_capacity(mapping.len());
    for (expected, (id, name)) in mapping.into_iter().enumerate() {
        if id != expected {
            return Err(PrepError::InvalidConfig {
                message: format!("class ids must be contiguous from 0; missing id {expected}"),
            });
        }
        names.push(name);
    }
    Ok(names)
}
