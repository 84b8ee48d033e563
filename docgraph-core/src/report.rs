// Report generation for ingestion runs and store contents

use crate::pipeline::{GraphReport, Phase};
use crate::store::StoreStats;
use chrono::{DateTime, Utc};
use docgraph_ingest::{IngestReport, WorkerOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub partition_len: usize,
    pub processed: usize,
    pub fallbacks: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl From<&WorkerOutcome> for WorkerSummary {
    fn from(outcome: &WorkerOutcome) -> Self {
        Self {
            worker: outcome.worker,
            partition_len: outcome.partition_len,
            processed: outcome.processed,
            fallbacks: outcome.fallbacks,
            skipped: outcome.skipped,
            failure: outcome.failure.as_ref().map(|f| f.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub total_items: usize,
    pub processed: usize,
    pub fallbacks: usize,
    pub skipped: usize,
    pub unprocessed: usize,
    pub workers: Vec<WorkerSummary>,
}

impl PhaseSummary {
    pub fn new(phase: Phase, report: &IngestReport) -> Self {
        Self {
            phase: phase.to_string(),
            total_items: report.total_items,
            processed: report.processed(),
            fallbacks: report.fallbacks(),
            skipped: report.skipped(),
            unprocessed: report.unprocessed(),
            workers: report.outcomes.iter().map(WorkerSummary::from).collect(),
        }
    }

    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerSummary> {
        self.workers.iter().filter(|w| w.failure.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub input: String,
    pub format: String,
    pub concurrency: usize,
    pub generated_at: i64,
    pub phases: Vec<PhaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSummary>,
}

/// Serializable copy of [`StoreStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSummary {
    pub nodes: usize,
    pub links: usize,
    pub constraints: usize,
    pub labels: Vec<(String, usize)>,
    pub link_types: Vec<(String, usize)>,
}

impl From<&StoreStats> for StoreSummary {
    fn from(stats: &StoreStats) -> Self {
        Self {
            nodes: stats.nodes,
            links: stats.links,
            constraints: stats.constraints,
            labels: stats.labels.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            link_types: stats
                .link_types
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

pub fn gather_report_data(
    input: &str,
    format: &str,
    concurrency: usize,
    report: &GraphReport,
    store: Option<&StoreStats>,
) -> ReportData {
    ReportData {
        input: input.to_string(),
        format: format.to_string(),
        concurrency,
        generated_at: Utc::now().timestamp(),
        phases: report
            .phases()
            .iter()
            .map(|(phase, report)| PhaseSummary::new(*phase, report))
            .collect(),
        store: store.map(StoreSummary::from),
    }
}

impl ReportData {
    pub fn is_complete(&self) -> bool {
        self.phases
            .iter()
            .all(|p| p.unprocessed == 0 && p.failed_workers().next().is_none())
    }

    fn format_timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.generated_at, 0)
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                         DOCGRAPH INGESTION REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Input:        {}\n", data.input));
    report.push_str(&format!("Format:       {}\n", data.format));
    report.push_str(&format!("Workers:      {}\n", data.concurrency));
    report.push_str(&format!("Generated:    {}\n", data.format_timestamp()));
    report.push_str(&format!(
        "Status:       {}\n\n",
        if data.is_complete() {
            "Complete"
        } else {
            "Partial"
        }
    ));

    for phase in &data.phases {
        report.push_str(RULE);
        report.push_str(&format!("{}\n", phase.phase.to_uppercase()));
        report.push_str(RULE);
        report.push('\n');

        report.push_str(&format!(
            "  Processed:   {}/{}\n",
            phase.processed, phase.total_items
        ));
        report.push_str(&format!("  Fallbacks:   {}\n", phase.fallbacks));
        report.push_str(&format!("  Skipped:     {}\n", phase.skipped));
        if phase.unprocessed > 0 {
            report.push_str(&format!("  Unprocessed: {}\n", phase.unprocessed));
        }

        for worker in phase.failed_workers() {
            report.push_str(&format!(
                "  [FAILED] worker {} after {}/{}: {}\n",
                worker.worker,
                worker.processed,
                worker.partition_len,
                worker.failure.as_deref().unwrap_or_default()
            ));
        }
        report.push('\n');
    }

    if let Some(ref store) = data.store {
        report.push_str(RULE);
        report.push_str("STORE\n");
        report.push_str(RULE);
        report.push('\n');
        report.push_str(&format_store_summary(store));
        report.push('\n');
    }

    report.push_str(RULE);
    report.push_str("\nGenerated by docgraph\n\n");
    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "docgraph",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": DateTime::<Utc>::from_timestamp(data.generated_at, 0)
                    .unwrap_or_else(Utc::now)
                    .to_rfc3339(),
                "format": "json"
            },
            "input": {
                "source": data.input,
                "format": data.format,
                "concurrency": data.concurrency
            },
            "complete": data.is_complete(),
            "phases": data.phases,
            "store": data.store
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Label and link type counts as aligned text.
pub fn format_store_summary(store: &StoreSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Nodes:       {}\n", store.nodes));
    out.push_str(&format!("  Links:       {}\n", store.links));
    out.push_str(&format!("  Constraints: {}\n", store.constraints));

    if !store.labels.is_empty() {
        out.push_str("\n  Nodes by label:\n");
        for (label, count) in &store.labels {
            out.push_str(&format!("    {:<16} {}\n", label, count));
        }
    }
    if !store.link_types.is_empty() {
        out.push_str("\n  Links by type:\n");
        for (link_type, count) in &store.link_types {
            out.push_str(&format!("    {:<16} {}\n", link_type, count));
        }
    }
    out
}

pub fn generate_stats_json(stats: &StoreStats) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
