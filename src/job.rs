use crate::config::OutputConfig;
use crate::pipeline::{PipelineRunner, PipelineStats};
use crate::rewrite::RewriteKind;
use crate::table::{loader, writer, Row, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Messages from background work to the UI task.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Loaded {
        path: PathBuf,
        table: Table,
        instruction: String,
    },
    RowDone {
        index: usize,
        total: usize,
        row: Row,
        outcome: RewriteKind,
    },
    Completed {
        table: Table,
        stats: PipelineStats,
    },
    Failed {
        message: String,
    },
    Saved {
        path: PathBuf,
    },
    SaveFailed {
        path: PathBuf,
        message: String,
    },
}

const FALLBACK_OUTPUT_NAME: &str = "seo_optimized_data.xlsx";

/// Load `path` and rewrite it on a background task. The job always ends
/// with exactly one `Completed` or `Failed` event, even if it panics.
pub fn spawn_rewrite(
    path: PathBuf,
    instruction_override: Option<String>,
    runner: Arc<PipelineRunner>,
    events: mpsc::UnboundedSender<JobEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let job_events = events.clone();
        let job = tokio::spawn(async move {
            run_rewrite(path, instruction_override, &runner, &job_events).await
        });
        let event = match job.await {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "rewrite task panicked");
                JobEvent::Failed { message: format!("An unexpected error occurred: {}", e) }
            }
        };
        let _ = events.send(event);
    })
}

/// Returns the terminal event of the job.
pub async fn run_rewrite(
    path: PathBuf,
    instruction_override: Option<String>,
    runner: &PipelineRunner,
    events: &mpsc::UnboundedSender<JobEvent>,
) -> JobEvent {
    let load_path = path.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        loader::load_with_instruction(&load_path, instruction_override.as_deref())
    })
    .await;

    let loaded = match loaded {
        Ok(Ok(loaded)) => loaded,
        Ok(Err(e)) => {
            tracing::error!(path = %path.display(), error = %e, "load failed");
            return JobEvent::Failed { message: format!("Error: {}", e) };
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "load task panicked");
            return JobEvent::Failed { message: format!("An unexpected error occurred: {}", e) };
        }
    };

    let _ = events.send(JobEvent::Loaded {
        path: path.clone(),
        table: loaded.table.clone(),
        instruction: loaded.instruction.clone(),
    });

    tracing::info!(path = %path.display(), instruction = %loaded.instruction, "rewrite started");
    match runner.run(&loaded.table, &loaded.instruction, events).await {
        Ok(output) => JobEvent::Completed { table: output.table, stats: output.stats },
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "rewrite failed");
            JobEvent::Failed { message: format!("Error: {}", e) }
        }
    }
}

/// Write `table` to `path` on a blocking task.
pub fn spawn_save(
    table: Arc<Table>,
    path: PathBuf,
    events: mpsc::UnboundedSender<JobEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let write_path = path.clone();
        let result = tokio::task::spawn_blocking(move || writer::write(&table, &write_path)).await;
        let event = match result {
            Ok(Ok(())) => JobEvent::Saved { path },
            Ok(Err(e)) => {
                tracing::error!(path = %path.display(), error = %e, "save failed");
                JobEvent::SaveFailed { path, message: e.to_string() }
            }
            Err(e) => JobEvent::SaveFailed { path, message: e.to_string() },
        };
        let _ = events.send(event);
    })
}

/// Where the download prompt starts: the configured file name, always
/// ending in `.xlsx`.
pub fn default_output_path(config: &OutputConfig) -> PathBuf {
    let name = config.default_file_name.trim();
    let name = if name.is_empty() { FALLBACK_OUTPUT_NAME } else { name };
    with_xlsx_extension(PathBuf::from(name))
}

pub(crate) fn with_xlsx_extension(path: PathBuf) -> PathBuf {
    if has_xlsx_extension(&path) {
        path
    } else {
        path.with_extension("xlsx")
    }
}

fn has_xlsx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}
