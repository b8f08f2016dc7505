//! Run aggregator.
//!
//! Expands tasks × models into testcases, runs them with bounded
//! concurrency, scores every result and summarizes the run.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use evalrun_core::{
    score_all, AvailableModel, EvalArgs, EvalCategory, EvalLogger, ScoreRecord, Testcase,
};
use evalrun_driver::{LaunchSession, SessionConfig, SessionLauncher, SessionOverrides};

use crate::contract::EvalContext;
use crate::registry::TaskDefinition;

/// Default number of testcases run at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Name of the score that decides whether a testcase passed.
const SUCCESS_SCORE: &str = "Exact match";

/// Outcome of one testcase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestcaseOutcome {
    pub testcase: Testcase,
    pub output: Value,
    pub scores: Vec<ScoreRecord>,
    pub duration_ms: u64,
}

impl TestcaseOutcome {
    /// Whether the success score is 1.
    pub fn passed(&self) -> bool {
        self.scores
            .iter()
            .any(|s| s.name == SUCCESS_SCORE && s.score >= 1.0)
    }
}

/// Summary of one eval run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<TestcaseOutcome>,

    /// Share of passing testcases per tag.
    pub category_success: BTreeMap<EvalCategory, f64>,

    /// Share of passing testcases per model.
    pub model_success: BTreeMap<String, f64>,

    pub overall_success: f64,
}

impl EvalSummary {
    fn build(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        mut results: Vec<TestcaseOutcome>,
    ) -> Self {
        results.sort_by(|a, b| a.testcase.metadata.test.cmp(&b.testcase.metadata.test));

        let mut per_category: BTreeMap<EvalCategory, (usize, usize)> = BTreeMap::new();
        let mut per_model: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for outcome in &results {
            let passed = usize::from(outcome.passed());
            for tag in &outcome.testcase.tags {
                let entry = per_category.entry(*tag).or_default();
                entry.0 += passed;
                entry.1 += 1;
            }
            let entry = per_model
                .entry(outcome.testcase.input.model_name.to_string())
                .or_default();
            entry.0 += passed;
            entry.1 += 1;
        }

        let passed = results.iter().filter(|o| o.passed()).count();

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            category_success: per_category
                .into_iter()
                .map(|(k, (p, t))| (k, ratio(p, t)))
                .collect(),
            model_success: per_model
                .into_iter()
                .map(|(k, (p, t))| (k, ratio(p, t)))
                .collect(),
            overall_success: ratio(passed, results.len()),
            results,
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|o| o.passed()).count()
    }

    /// Write the summary as pretty JSON.
    pub async fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, bytes).await
    }
}

fn ratio(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64
    }
}

/// Runs registered tasks against one or more models.
pub struct EvalRunner {
    launcher: Arc<dyn SessionLauncher>,
    models: Vec<AvailableModel>,
    concurrency: usize,
    use_text_extract: bool,
    use_accessibility_tree: bool,
    headless: bool,
    overrides: SessionOverrides,
}

impl EvalRunner {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            models: vec![AvailableModel::default()],
            concurrency: DEFAULT_CONCURRENCY,
            use_text_extract: false,
            use_accessibility_tree: false,
            headless: false,
            overrides: SessionOverrides::default(),
        }
    }

    pub fn with_models(mut self, models: Vec<AvailableModel>) -> Self {
        if !models.is_empty() {
            self.models = models;
        }
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_text_extract(mut self, enabled: bool) -> Self {
        self.use_text_extract = enabled;
        self
    }

    pub fn with_accessibility_tree(mut self, enabled: bool) -> Self {
        self.use_accessibility_tree = enabled;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Session overrides applied to every testcase (env, CDP endpoint, ...).
    pub fn with_overrides(mut self, overrides: SessionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Testcases for `tasks`, one per model.
    pub fn testcases(
        &self,
        tasks: &[&'static TaskDefinition],
    ) -> Vec<(&'static TaskDefinition, Testcase)> {
        tasks
            .iter()
            .flat_map(|task| {
                self.models
                    .iter()
                    .map(move |model| (*task, Testcase::new(task.name, *model, task.tags.to_vec())))
            })
            .collect()
    }

    /// Run every testcase and summarize.
    #[instrument(skip_all, fields(tasks = tasks.len(), models = self.models.len()))]
    pub async fn run(&self, tasks: &[&'static TaskDefinition]) -> EvalSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let testcases = self.testcases(tasks);
        info!(%run_id, testcases = testcases.len(), concurrency = self.concurrency, "Starting eval run");

        let results: Vec<TestcaseOutcome> = futures_util::stream::iter(
            testcases
                .into_iter()
                .map(|(task, testcase)| self.run_testcase(task, testcase)),
        )
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let summary = EvalSummary::build(run_id, started_at, results);
        info!(
            %run_id,
            passed = summary.passed(),
            total = summary.results.len(),
            overall = summary.overall_success,
            "Eval run finished"
        );
        summary
    }

    async fn run_testcase(&self, task: &'static TaskDefinition, testcase: Testcase) -> TestcaseOutcome {
        let model = testcase.input.model_name;
        let logger = EvalLogger::new();

        let config = SessionConfig::new(model, logger.clone())
            .with_headless(self.headless)
            .apply(&self.overrides);
        let provider = Arc::new(LaunchSession::new(Arc::clone(&self.launcher), config));

        let ctx = EvalContext::new(model, logger, provider)
            .with_text_extract(self.use_text_extract)
            .with_accessibility_tree(self.use_accessibility_tree);

        let started = Instant::now();
        let result = (task.run)(ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let output = result.to_output();
        let args = EvalArgs {
            input: testcase.input.clone(),
            output: output.clone(),
            expected: testcase.expected.clone(),
            metadata: Some(testcase.metadata.clone()),
        };
        let scores = score_all(&args);

        info!(
            test = %testcase.metadata.test,
            success = result.success,
            duration_ms,
            "Testcase finished"
        );

        TestcaseOutcome {
            testcase,
            output,
            scores,
            duration_ms,
        }
    }
}
