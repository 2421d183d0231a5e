pub mod render;
pub mod state;

use crate::job::{self, JobEvent};
use crate::pipeline::PipelineRunner;
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::{AppState, UiAction};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run the TUI until the user quits. Background jobs report back on an
/// event channel that only this task drains.
pub async fn run_tui(state: AppState, runner: Arc<PipelineRunner>) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state, runner).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state: AppState,
    runner: Arc<PipelineRunner>,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<JobEvent>();
    let mut keys = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut spinner_frame: u8 = 0;

    state.push_log("INFO", "Press [u] to upload a .xlsx or .csv file".to_string());

    loop {
        terminal.draw(|f| render::draw(f, &state, spinner_frame))?;

        tokio::select! {
            maybe_event = keys.next() => {
                let Some(event) = maybe_event else { return Ok(()) };
                if let Event::Key(key) = event? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match state.handle_key(key) {
                        Some(UiAction::Quit) => return Ok(()),
                        Some(UiAction::Upload { path, instruction }) => {
                            tracing::info!(path = %path.display(), "upload requested");
                            state.begin_job(path.clone());
                            job::spawn_rewrite(path, instruction, runner.clone(), event_tx.clone());
                        }
                        Some(UiAction::Download { path, table }) => {
                            tracing::info!(path = %path.display(), "download requested");
                            state.push_log("INFO", format!("Saving to {}", path.display()));
                            job::spawn_save(table, path, event_tx.clone());
                        }
                        None => {}
                    }
                }
            }
            Some(job_event) = event_rx.recv() => {
                state.apply(job_event);
                // Drain whatever else is queued so a fast job doesn't redraw per row.
                while let Ok(more) = event_rx.try_recv() {
                    state.apply(more);
                }
            }
            _ = tick.tick() => {
                if state.job_active() {
                    spinner_frame = spinner_frame.wrapping_add(1);
                }
            }
        }
    }
}
