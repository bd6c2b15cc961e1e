use crate::types::DEFAULT_NAMESPACE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_min_text_chars() -> usize {
    1
}

fn default_max_depth() -> usize {
    256
}

fn default_strip_tags() -> Vec<String> {
    ["script", "style", "noscript"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_abbreviations() -> Vec<String> {
    ["mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "inc", "ltd", "co", "no"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_iterations() -> usize {
    64
}

fn default_threshold() -> f32 {
    0.3
}

fn default_top_k() -> usize {
    5
}

fn default_dimension() -> usize {
    384
}

/// Top-level configuration for one graph pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Expansion of the `ex:` prefix on export
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub preprocessor: PreprocessorConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            builder: BuilderConfig::default(),
            preprocessor: PreprocessorConfig::default(),
            segmentation: SegmentationConfig::default(),
            reasoning: ReasoningConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Emit TextContent/TextSegment subgraphs for elements with text
    #[serde(default = "default_true")]
    pub decompose_text: bool,
    /// Minimum normalized text length (in chars) that counts as non-trivial
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    /// Nesting bound; deeper documents fail with a traversal depth error
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            decompose_text: true,
            min_text_chars: default_min_text_chars(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Elements whose whole subtree is dropped while parsing
    #[serde(default = "default_strip_tags")]
    pub strip_tags: Vec<String>,
    #[serde(default = "default_true")]
    pub keep_comments: bool,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            strip_tags: default_strip_tags(),
            keep_comments: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Lower-cased tokens (without the trailing period) that never end a sentence
    #[serde(default = "default_abbreviations")]
    pub abbreviations: Vec<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            abbreviations: default_abbreviations(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitiveMode {
    #[default]
    Fixpoint,
    SinglePass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub transitive_contains: TransitiveMode,
    /// Upper bound on closure passes before a strategy gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Pipeline configuration - which strategies run and in what order
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            transitive_contains: TransitiveMode::default(),
            max_iterations: default_max_iterations(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List of rules to run in order
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the rule
    pub name: String,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RuleConfig {
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                RuleConfig::new("TransitiveContains", true),
                RuleConfig::new("ClassSimilarity", true),
                RuleConfig::new("Rdfs", false),
                RuleConfig::new("OwlRl", false),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Embedding width of the default embedder
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            dimension: default_dimension(),
        }
    }
}

impl GraphConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {path}"))?;
        let config: GraphConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!(path = p, error = %e, "Failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            anyhow::bail!("namespace must not be empty");
        }
        if self.builder.max_depth == 0 {
            anyhow::bail!("builder.max_depth must be at least 1");
        }
        if self.reasoning.max_iterations == 0 {
            anyhow::bail!("reasoning.max_iterations must be at least 1");
        }
        if self.search.dimension == 0 {
            anyhow::bail!("search.dimension must be at least 1");
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
