//! Row-by-row rewrite of a loaded product table.
//!
//! Row zero carries the instruction and is dropped from the result. Every
//! other row is rewritten in input order, one at a time, and each finished
//! row is published as a [`JobEvent::RowDone`] before the next one starts.

use crate::error::TableError;
use crate::job::JobEvent;
use crate::rewrite::{RewriteKind, RowTransformer};
use crate::table::{CellValue, Table, DESCRIPTION_COLUMN};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Per-outcome row counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub generated: usize,
    pub fallback: usize,
    pub sentinel: usize,
}

impl PipelineStats {
    fn record(&mut self, kind: RewriteKind) {
        match kind {
            RewriteKind::Generated => self.generated += 1,
            RewriteKind::Fallback => self.fallback += 1,
            RewriteKind::Sentinel => self.sentinel += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.generated + self.fallback + self.sentinel
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: Table,
    pub stats: PipelineStats,
}

pub struct PipelineRunner {
    transformer: Arc<RowTransformer>,
}

impl PipelineRunner {
    pub fn new(transformer: Arc<RowTransformer>) -> Self {
        Self { transformer }
    }

    pub async fn run(
        &self,
        table: &Table,
        instruction: &str,
        events: &mpsc::UnboundedSender<JobEvent>,
    ) -> Result<PipelineOutput, TableError> {
        let desc_col = table.require_column(DESCRIPTION_COLUMN)?;
        let total = table.data_row_count();
        let started = Instant::now();

        let mut result = Table::new(table.columns.clone());
        result.rows.reserve(total);
        let mut stats = PipelineStats::default();

        for (i, source) in table.rows.iter().enumerate().skip(1) {
            let rewrite = self.transformer.transform(source.get(desc_col), instruction).await;
            let kind = rewrite.kind();
            stats.record(kind);

            let mut row = source.clone();
            if row.cells.len() <= desc_col {
                row.cells.resize(desc_col + 1, CellValue::Blank);
            }
            row.cells[desc_col] = CellValue::Text(rewrite.text().to_string());

            tracing::debug!(row = i, total, outcome = ?kind, "row rewritten");
            // Receiver gone means the UI exited; finish the run regardless.
            let _ = events.send(JobEvent::RowDone {
                index: i,
                total,
                row: row.clone(),
                outcome: kind,
            });
            result.rows.push(row);
        }

        tracing::info!(
            rows = stats.total(),
            generated = stats.generated,
            fallback = stats.fallback,
            sentinel = stats.sentinel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(PipelineOutput { table: result, stats })
    }
}
