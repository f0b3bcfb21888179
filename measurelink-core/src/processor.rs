use crate::binder::MeasurementBinder;
use crate::cache::RuleSetCache;
use crate::config::ExtractorConfig;
use crate::error::{AlignmentError, ConfigError, ExtractError};
use crate::graphs::{DependencyGraph, GraphBuilder};
use crate::rules::{DebugConfig, RelatedMatch, RuleEngine, RuleSet};
use crate::types::*;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Captured intermediate outputs from each extraction stage.
/// Used for testing and diagnostics to inspect each boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionStages {
    pub text: String,
    pub edges: Vec<DependencyEdge>,
    pub bound: Vec<Measurement>,
    pub dropped: Vec<DroppedMeasurement>,
    /// Raw matcher output per bound measurement, before building and filtering
    pub matches: Vec<Vec<RelatedMatch>>,
    pub records: Vec<MeasurementRecord>,
}

/// Simple profiler that collects timings for extraction steps
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

        self.timings.push((step_name.to_string(), elapsed));
        info!("⏱️  {}: {}µs", step_name, elapsed.as_micros());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {}µs ({:.1}%)",
                step,
                duration.as_micros(),
                percentage
            );
        }
        info!("   {:.<35} {}µs", "Total", total.as_micros());
    }
}

/// Counters over one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub sentences_total: usize,
    pub sentences_parsed: usize,
    pub sentences_skipped: usize,
    pub measurements_total: usize,
    pub measurements_found: usize,
    pub measurements_dropped: usize,
    pub related_found: usize,
    pub elapsed_ms: u64,
}

impl ExtractionStats {
    pub fn record(&mut self, input: &SentenceInput, result: &Result<SentenceExtraction, ExtractError>) {
        self.sentences_total += 1;
        self.measurements_total += input.measurements.len();
        match result {
            Ok(extraction) => {
                self.sentences_parsed += 1;
                self.measurements_found += extraction.records.len();
                self.measurements_dropped += extraction.dropped.len();
                self.related_found += extraction
                    .records
                    .iter()
                    .map(|r| r.related.len())
                    .sum::<usize>();
            }
            Err(_) => self.sentences_skipped += 1,
        }
    }

    pub fn print_summary(&self) {
        info!("📊 Extraction Summary:");
        info!("   Sentences parsed: {}/{}", self.sentences_parsed, self.sentences_total);
        info!("   Sentences skipped: {}", self.sentences_skipped);
        info!(
            "   Measurements found: {}/{}",
            self.measurements_found, self.measurements_total
        );
        info!("   Measurements dropped: {}", self.measurements_dropped);
        info!("   Related entities: {}", self.related_found);
        info!("   Elapsed: {}ms", self.elapsed_ms);
    }
}

/// Results for a batch, in input order
#[derive(Debug)]
pub struct BatchExtraction {
    pub results: Vec<Result<SentenceExtraction, ExtractError>>,
    pub stats: ExtractionStats,
}

impl BatchExtraction {
    pub fn extractions(&self) -> impl Iterator<Item = &SentenceExtraction> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ExtractError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }
}

pub struct MeasurementExtractor {
    rule_engine: RuleEngine,
    graph_builder: GraphBuilder,
    binder: MeasurementBinder,
    profiling: bool,
}

impl MeasurementExtractor {
    pub fn new(rules: Arc<RuleSet>, config: ExtractorConfig) -> Self {
        Self {
            rule_engine: RuleEngine::new(rules, config),
            graph_builder: GraphBuilder::new(),
            binder: MeasurementBinder::new(),
            profiling: false,
        }
    }

    /// Extractor over the bundled pattern document and default settings
    pub fn with_builtin_rules() -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(RuleSet::builtin()?), ExtractorConfig::default()))
    }

    /// Extractor whose rule set comes from (and stays in) `cache`
    pub fn from_cache(
        cache: &RuleSetCache,
        patterns: Option<&Path>,
        config: ExtractorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = match patterns {
            Some(path) => cache.get_or_load(path)?,
            None => cache.builtin()?,
        };
        Ok(Self::new(rules, config))
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.rule_engine.set_debug_config(debug_config);
    }

    pub fn set_profiling(&mut self, enabled: bool) {
        self.profiling = enabled;
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.rule_engine
    }

    /// Extract records for one parsed sentence. `sentence` is the 1-based
    /// number used in results and errors.
    pub fn extract(
        &self,
        sentence: usize,
        input: &SentenceInput,
    ) -> Result<SentenceExtraction, ExtractError> {
        let mut profiler = StepProfiler::new(self.profiling);

        let graph = profiler
            .time_step("1. Graph Construction", || {
                self.graph_builder.build_parsed(&input.parse)
            })
            .map_err(|source| ExtractError::Graph { sentence, source })?;

        let (records, dropped) = profiler.time_step("2. Binding + Matching", || {
            self.extract_graph(&graph, &input.measurements)
        });

        profiler.print_summary();

        Ok(SentenceExtraction {
            sentence,
            text: graph.text(),
            records,
            dropped,
        })
    }

    /// Bind spans to an already built graph and relate each one.
    pub fn extract_graph(
        &self,
        graph: &DependencyGraph,
        spans: &[MeasurementSpan],
    ) -> (Vec<MeasurementRecord>, Vec<DroppedMeasurement>) {
        let outcome = self.binder.bind(spans, graph);
        let dropped = dropped_records(spans, &outcome.dropped);
        let records = outcome
            .bound
            .iter()
            .map(|m| self.rule_engine.relate(graph, m))
            .collect();
        (records, dropped)
    }

    /// Extract a batch in parallel. Output order matches input order; a
    /// sentence whose graph cannot be built is reported and skipped.
    pub fn extract_batch(&self, inputs: &[SentenceInput]) -> BatchExtraction {
        info!("📦 Extracting measurements from {} sentences", inputs.len());
        let start = Instant::now();

        let results: Vec<_> = inputs
            .par_iter()
            .enumerate()
            .map(|(i, input)| self.extract(i + 1, input))
            .collect();

        let mut stats = ExtractionStats::default();
        for (input, result) in inputs.iter().zip(&results) {
            if let Err(err) = result {
                warn!("⚠️  Skipping {}", err);
            }
            stats.record(input, result);
        }
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "✅ {} measurements from {}/{} sentences",
            stats.measurements_found, stats.sentences_parsed, stats.sentences_total
        );
        BatchExtraction { results, stats }
    }

    /// Run one sentence and keep every intermediate stage. `sentence` is the
    /// 1-based number reported in errors.
    pub fn extract_capture_stages(
        &self,
        sentence: usize,
        input: &SentenceInput,
    ) -> Result<ExtractionStages, ExtractError> {
        let graph = self
            .graph_builder
            .build_parsed(&input.parse)
            .map_err(|source| ExtractError::Graph { sentence, source })?;

        let outcome = self.binder.bind(&input.measurements, &graph);
        let matcher = self.rule_engine.matcher();
        let matches = outcome
            .bound
            .iter()
            .map(|m| matcher.find_related(&graph, m, &m.anchors()))
            .collect();
        let records = outcome
            .bound
            .iter()
            .map(|m| self.rule_engine.relate(&graph, m))
            .collect();

        Ok(ExtractionStages {
            text: graph.text(),
            edges: graph.edges().to_vec(),
            dropped: dropped_records(&input.measurements, &outcome.dropped),
            bound: outcome.bound,
            matches,
            records,
        })
    }
}

fn dropped_records(spans: &[MeasurementSpan], errors: &[AlignmentError]) -> Vec<DroppedMeasurement> {
    errors
        .iter()
        .map(|err| {
            let raw_value = spans
                .get(err.measurement())
                .map(|s| s.raw_value.as_str())
                .unwrap_or_default();
            DroppedMeasurement::from_error(raw_value, err)
        })
        .collect()
}
