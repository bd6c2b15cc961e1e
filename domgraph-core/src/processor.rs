use crate::config::GraphConfig;
use crate::document::DocumentTree;
use crate::error::{GraphError, Result};
use crate::graphs::{GraphBuilder, GraphStore};
use crate::hashing::{calculate_config_hash, calculate_markup_hash};
use crate::preprocessors::{HtmlPreprocessor, Preprocessor};
use crate::rules::{InferenceEngine, ReasoningStrategy};
use crate::types::BuildReport;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        debug!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "Step finished");
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                step = step.as_str(),
                elapsed_ms = duration.as_millis() as u64,
                percent = format!("{percentage:.1}"),
                "Performance summary"
            );
        }
        info!(total_ms = total.as_millis() as u64, "Performance summary total");
    }
}

/// What one pipeline run produced besides the store itself
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub build: BuildReport,
    pub inferred: usize,
    pub step_timings: Vec<(String, Duration)>,
    pub rule_timings: Vec<(String, Duration)>,
    pub total: Duration,
}

#[derive(Debug)]
pub struct ProcessedPage {
    pub store: GraphStore,
    pub report: ProcessingReport,
}

/// Markup → document tree → graph → inference, for one page at a time.
pub struct PageProcessor {
    config: GraphConfig,
    preprocessor: Box<dyn Preprocessor>,
    builder: GraphBuilder,
    engine: InferenceEngine,
    strategies: Option<Vec<ReasoningStrategy>>,
}

impl Default for PageProcessor {
    fn default() -> Self {
        Self::new(&GraphConfig::default())
    }
}

impl PageProcessor {
    pub fn new(config: &GraphConfig) -> Self {
        Self::new_with_dependencies(
            config,
            Box::new(HtmlPreprocessor::new(&config.preprocessor)),
            GraphBuilder::new(config),
        )
    }

    /// Create a processor with an injected preprocessor and builder
    pub fn new_with_dependencies(
        config: &GraphConfig,
        preprocessor: Box<dyn Preprocessor>,
        builder: GraphBuilder,
    ) -> Self {
        Self {
            config: config.clone(),
            preprocessor,
            builder,
            engine: InferenceEngine::new(&config.reasoning),
            strategies: None,
        }
    }

    /// Run exactly these strategies instead of the configured pipeline
    pub fn with_strategies(mut self, strategies: Vec<ReasoningStrategy>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn process_markup(&self, markup: &str, source_url: Option<&str>) -> Result<ProcessedPage> {
        self.process_markup_with_profiling(markup, source_url, false)
    }

    /// Read and process a markup file the preprocessor accepts
    pub fn process_file(
        &self,
        path: &Path,
        source_url: Option<&str>,
        profile: bool,
    ) -> Result<ProcessedPage> {
        if !self.preprocessor.supports_file_type(path) {
            return Err(GraphError::UnsupportedFile(path.display().to_string()));
        }
        let markup = std::fs::read_to_string(path)?;
        info!(path = %path.display(), bytes = markup.len(), "Processing page");
        self.process_markup_with_profiling(&markup, source_url, profile)
    }

    pub fn process_markup_with_profiling(
        &self,
        markup: &str,
        source_url: Option<&str>,
        profile: bool,
    ) -> Result<ProcessedPage> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(profile);

        let (markup_hash, config_hash) = profiler.time_step("1. Hashing", || {
            Ok::<_, GraphError>((
                calculate_markup_hash(markup),
                calculate_config_hash(&self.config)?,
            ))
        })?;

        let tree: DocumentTree = profiler.time_step("2. Markup → DocumentTree", || {
            self.preprocessor.parse_markup(markup)
        })?;

        let mut store = GraphStore::with_namespace(&self.config.namespace);
        let build = profiler.time_step("3. Graph Construction", || {
            self.builder.build_into(&mut store, &tree, source_url)
        })?;

        let inferred = profiler.time_step("4. Inference", || match &self.strategies {
            Some(strategies) => self.engine.apply_strategies(&mut store, strategies),
            None => self.engine.apply_pipeline(&mut store),
        })?;

        let metadata = store.metadata_mut();
        metadata.markup_hash = Some(markup_hash);
        metadata.config_hash = Some(config_hash);

        profiler.log_summary();
        let total = start_time.elapsed();
        info!(
            preprocessor = self.preprocessor.name(),
            statements = store.len(),
            inferred,
            total_ms = total.as_millis() as u64,
            "Processed page"
        );

        Ok(ProcessedPage {
            report: ProcessingReport {
                build,
                inferred,
                step_timings: profiler.timings().to_vec(),
                rule_timings: self.engine.timings(),
                total,
            },
            store,
        })
    }
}
