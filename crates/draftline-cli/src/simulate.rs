//! End-to-end simulation of a new-strategy session against in-memory
//! collaborators.

use chrono::{Days, Utc};
use draftline_composer::{ComposerConfig, FinalizeReport, FlushAction, ItemOutcome, StrategyComposer};
use draftline_core::{ChildFields, GoalFields, NamedFields, PendingFile, StrategyFields};
use draftline_staging::{DurableLocalStore, FileLocalStore, MemoryLocalStore};
use draftline_test_utils::{InMemoryBlobStorage, InMemoryGateway, StaticIdentity};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Simulation parameters
#[derive(Debug, Clone)]
pub(crate) struct SimulatorConfig {
    pub(crate) values: usize,
    pub(crate) pillars: usize,
    pub(crate) goals: usize,
    pub(crate) attachments: usize,
    /// Every nth child create fails; 0 disables
    pub(crate) fail_every: usize,
    pub(crate) state_dir: Option<PathBuf>,
    pub(crate) composer: ComposerConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            values: 2,
            pillars: 1,
            goals: 0,
            attachments: 1,
            fail_every: 0,
            state_dir: None,
            composer: ComposerConfig::default(),
        }
    }
}

/// What the simulated session produced
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulatorReport {
    pub(crate) staged: usize,
    pub(crate) uploaded: usize,
    pub(crate) finalize: FinalizeReport,
}

impl SimulatorReport {
    pub(crate) fn passed(&self) -> bool {
        self.finalize.is_clean()
    }

    pub(crate) fn generate_text(&self) -> String {
        let finalize = &self.finalize;
        let mut report = String::new();

        report.push_str("=== Finalize Report ===\n\n");
        report.push_str(&format!(
            "Strategy: {} ({})\n",
            finalize.strategy.fields.name, finalize.strategy.id
        ));
        report.push_str(&format!("Committed: {}\n", finalize.parent_committed()));
        report.push_str(&format!("Staged children: {}\n", self.staged));
        report.push_str(&format!("Attachments uploaded: {}\n", self.uploaded));
        report.push_str(&format!("Children created: {}\n", finalize.created_count()));
        report.push_str(&format!("Failures: {}\n", finalize.failures().count()));
        for failure in finalize.failures() {
            let target = match &failure.action {
                FlushAction::Create { namespace, item } => format!("{namespace}/{}", item.fields.name()),
                FlushAction::Delete { marker } => format!("delete {}", marker.record_id()),
            };
            if let ItemOutcome::Failed { error, retryable } = &failure.outcome {
                report.push_str(&format!("  ✗ {target}: {error} (retryable: {retryable})\n"));
            }
        }
        report.push_str(&format!("Staging cleared: {}\n", finalize.staging_cleared));
        report
    }
}

/// Run one draft session from acquire to finalize
pub(crate) async fn run_simulator(config: SimulatorConfig) -> anyhow::Result<SimulatorReport> {
    let local: Arc<dyn DurableLocalStore> = match &config.state_dir {
        Some(dir) => Arc::new(FileLocalStore::open(dir)?),
        None => Arc::new(MemoryLocalStore::new()),
    };
    let gateway = Arc::new(InMemoryGateway::new());
    let composer = StrategyComposer::new(
        config.composer.clone(),
        gateway.clone(),
        Arc::new(InMemoryBlobStorage::new()),
        Arc::new(StaticIdentity::signed_in("simulator")),
        local,
    );

    let session = composer.drafts().acquire(None).await?;
    tracing::info!(strategy_id = %session.strategy_id, "simulated session started");

    let mut staged = 0;
    for i in 0..config.values {
        composer.stage_child(ChildFields::Value(NamedFields::new(format!("Value {}", i + 1))))?;
        staged += 1;
    }
    for i in 0..config.pillars {
        composer.stage_child(ChildFields::Pillar(NamedFields::new(format!("Pillar {}", i + 1))))?;
        staged += 1;
    }
    for i in 0..config.goals {
        let goal = GoalFields::new(format!("Goal {}", i + 1), "1 year", "delivery");
        let fields = if i % 2 == 0 {
            ChildFields::StrategicGoal(goal)
        } else {
            ChildFields::OperationalGoal(goal)
        };
        composer.stage_child(fields)?;
        staged += 1;
    }

    let attachments = composer.attachments();
    for i in 0..config.attachments {
        let file = PendingFile::new(format!("attachment-{}.pdf", i + 1), "application/pdf", vec![0x25; 64]);
        attachments.stage_upload(session.strategy_id, file).await?;
    }

    if config.fail_every > 0 {
        gateway.fail_every_nth_child_create(config.fail_every);
    }

    let finalize = composer.finalize(&session, final_fields()).await?;

    Ok(SimulatorReport {
        staged,
        uploaded: config.attachments,
        finalize,
    })
}

fn final_fields() -> StrategyFields {
    let start = Utc::now().date_naive();
    let end = start.checked_add_days(Days::new(365)).unwrap_or(start);
    StrategyFields::new("Simulated strategy", start, end)
        .with_description("Generated by draftline simulate")
        .with_vision_mission("Exercise the draft workflow end to end")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn default_simulation_is_clean() {
        let report = run_simulator(SimulatorConfig::default()).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.staged, 3);
        assert_eq!(report.finalize.created_count(), 3);
        let text = report.generate_text();
        assert!(text.starts_with("=== Finalize Report ==="));
        assert!(text.contains("Failures: 0"));
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let config = SimulatorConfig {
            values: 4,
            pillars: 0,
            fail_every: 2,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(config).await.unwrap();
        assert!(!report.passed());
        assert!(report.finalize.parent_committed());
        assert_eq!(report.finalize.failures().count(), 2);
        assert!(report.generate_text().contains("Value 2"));
    }

    #[tokio::test]
    async fn state_dir_is_empty_after_clean_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulatorConfig {
            state_dir: Some(dir.path().to_path_buf()),
            ..SimulatorConfig::default()
        };
        run_simulator(config).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
