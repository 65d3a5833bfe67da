//! Configuration for spanrec.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags
//! 2. Environment variables (SPANREC_KEY_FIELD, SPANREC_THRESHOLD)
//! 3. Config file (--config / SPANREC_CONFIG, else discovered .spanrec/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .spanrec/config.yaml
//! - Paths in config file are relative to the config file's directory

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::adapters::hashing::DEFAULT_DIMENSIONS;
use crate::adapters::knn::load_relabeler;
use crate::core::{load_exclusion_list, Engine, OverlapDetector, RelevanceFilter, DEFAULT_SIMILARITY_THRESHOLD};
use crate::domain::KeyFallback;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub overlap: OverlapConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupingConfig {
    /// Field holding the document identifier
    pub key_field: Option<String>,
    /// What to do with spans missing that field
    #[serde(default)]
    pub fallback: KeyFallback,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverlapConfig {
    pub similarity_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelevanceConfig {
    /// One excluded phrase per line (relative to config file)
    pub exclusion_file: Option<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Minimum detector score per label
    #[serde(default)]
    pub min_scores: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// kNN reference set (relative to config file)
    pub reference_file: String,
    pub dimensions: Option<usize>,
}

/// Classifier settings with an absolute reference path
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedClassifier {
    pub reference_file: PathBuf,
    pub dimensions: usize,
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub key_field: Option<String>,
    pub fallback: KeyFallback,
    pub similarity_threshold: f64,
    pub exclusions: HashSet<String>,
    pub min_scores: HashMap<String, f64>,
    pub classifier: Option<ResolvedClassifier>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            key_field: None,
            fallback: KeyFallback::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            exclusions: HashSet::new(),
            min_scores: HashMap::new(),
            classifier: None,
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Resolve a parsed config file; relative paths are anchored at `base`
    pub fn from_file(file: ConfigFile, base: &Path, path: Option<PathBuf>) -> Result<Self> {
        let mut exclusions: HashSet<String> = file
            .relevance
            .exclusions
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if let Some(ref exclusion_file) = file.relevance.exclusion_file {
            exclusions.extend(load_exclusion_list(&resolve_path(base, exclusion_file))?);
        }

        let classifier = file.classifier.map(|c| ResolvedClassifier {
            reference_file: resolve_path(base, &c.reference_file),
            dimensions: c.dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        });

        let config = Self {
            key_field: file.grouping.key_field,
            fallback: file.grouping.fallback,
            similarity_threshold: file
                .overlap
                .similarity_threshold
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            exclusions,
            min_scores: file.relevance.min_scores,
            classifier,
            config_file: path,
        };
        config.check_threshold()?;
        Ok(config)
    }

    /// Apply higher-priority overrides (environment, CLI flags)
    pub fn apply_overrides(&mut self, key_field: Option<String>, threshold: Option<f64>) -> Result<()> {
        if let Some(field) = key_field {
            self.key_field = Some(field);
        }
        if let Some(threshold) = threshold {
            self.similarity_threshold = threshold;
        }
        self.check_threshold()
    }

    fn check_threshold(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            anyhow::bail!(
                "similarity_threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            );
        }
        Ok(())
    }

    /// Build an engine from this configuration
    pub fn build_engine(&self) -> Result<Engine> {
        let filter = RelevanceFilter::new(self.exclusions.iter().cloned(), self.min_scores.clone());

        let mut engine = Engine::new(OverlapDetector::new(self.similarity_threshold))
            .with_filter(filter)
            .with_grouping(self.key_field.clone(), self.fallback);

        if let Some(ref classifier) = self.classifier {
            match load_relabeler(&classifier.reference_file, classifier.dimensions) {
                Ok(relabeler) => engine = engine.with_relabeler(relabeler),
                Err(e) => {
                    warn!(
                        reference = %classifier.reference_file.display(),
                        error = %format!("{:#}", e),
                        "Classifier unavailable, relabeling disabled for this run"
                    );
                    engine = engine.with_unavailable_relabeler();
                }
            }
        }

        Ok(engine)
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".spanrec").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Read an environment override, ignoring unset or blank values
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load configuration from file and environment
pub fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => match env_var("SPANREC_CONFIG") {
            Some(path) => Some(PathBuf::from(path)),
            None => find_config_file(&std::env::current_dir()?),
        },
    };

    let mut config = match config_path {
        Some(path) => {
            let file = load_config_file(&path)?;
            let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            ResolvedConfig::from_file(file, &base, Some(path))?
        }
        None => ResolvedConfig::default(),
    };

    let threshold = env_var("SPANREC_THRESHOLD")
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("SPANREC_THRESHOLD is not a number: {}", v))
        })
        .transpose()?;
    config.apply_overrides(env_var("SPANREC_KEY_FIELD"), threshold)?;

    Ok(config)
}
