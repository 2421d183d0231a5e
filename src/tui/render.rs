use std::borrow::Cow;

use super::state::{AppState, DialogKind, Focus, JobStatus};
use crate::table::Table;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table as TableWidget, Wrap},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn draw(f: &mut Frame, state: &AppState, spinner_frame: u8) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Min(6),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, state, chunks[0], spinner_frame);
    draw_table(
        f,
        " Input ",
        state.input.as_ref(),
        state.input_scroll,
        state.focus == Focus::Input,
        chunks[1],
    );
    draw_table(
        f,
        " Optimized ",
        state.output.as_ref(),
        state.output_scroll,
        state.focus == Focus::Output,
        chunks[2],
    );
    draw_logs(f, state, chunks[3]);
    draw_footer(f, state, chunks[4]);

    if state.prompt.is_some() {
        draw_prompt(f, state);
    }
    if state.dialog.is_some() {
        draw_dialog(f, state);
    }
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let status_style = match state.status {
        JobStatus::Idle => Style::default().fg(Color::Gray),
        JobStatus::Processing { .. } => Style::default().fg(Color::Yellow),
        JobStatus::Complete(_) => Style::default().fg(Color::Green),
        JobStatus::Failed => Style::default().fg(Color::Red),
    };

    let mut status_spans = vec![Span::styled(" Status: ", Style::default().fg(Color::DarkGray))];
    if state.job_active() {
        let ch = SPINNER_FRAMES[(spinner_frame as usize) % SPINNER_FRAMES.len()];
        status_spans.push(Span::styled(format!("{} ", ch), Style::default().fg(Color::Cyan)));
    }
    status_spans.push(Span::styled(
        state.status_text(),
        status_style.add_modifier(Modifier::BOLD),
    ));
    if state.fallback_rows > 0 {
        status_spans.push(Span::styled(
            format!("  ({} rows kept original text)", state.fallback_rows),
            Style::default().fg(Color::Yellow),
        ));
    }

    let file = state
        .input_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    let instruction = state
        .instruction_override
        .as_deref()
        .map(|s| format!("{} (override)", s))
        .or_else(|| state.instruction.clone())
        .unwrap_or_else(|| "-".to_string());

    let width = area.width.saturating_sub(14) as usize;
    let lines = vec![
        Line::from(status_spans),
        Line::from(vec![
            Span::styled(" File: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate_with_ellipsis(&file, width).into_owned()),
        ]),
        Line::from(vec![
            Span::styled(" Instruction: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate_with_ellipsis(&instruction, width).into_owned()),
        ]),
    ];

    let block = Block::default()
        .title(" SEO Description Optimizer ")
        .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .borders(Borders::TOP);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_table(
    f: &mut Frame,
    title: &str,
    table: Option<&Table>,
    scroll: usize,
    focused: bool,
    area: Rect,
) {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let Some(table) = table.filter(|t| !t.columns.is_empty()) else {
        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(border_style);
        let para = Paragraph::new(Line::from(Span::styled(
            "Press [u] to upload a .xlsx or .csv file.",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(para, area);
        return;
    };

    let visible = area.height.saturating_sub(3) as usize;
    let offset = scroll.min(table.rows.len().saturating_sub(visible));
    let inner_width = area.width.saturating_sub(2) as usize;
    let (constraints, widths) = column_widths(table, inner_width);

    let header = Row::new(
        table
            .columns
            .iter()
            .map(|c| Cell::from(c.clone()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = table
        .rows
        .iter()
        .skip(offset)
        .take(visible)
        .map(|r| {
            Row::new(
                widths
                    .iter()
                    .enumerate()
                    .map(|(i, w)| {
                        let text = r.get(i).to_string().replace('\n', " ");
                        Cell::from(truncate_with_ellipsis(&text, *w).into_owned())
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let title = format!(
        "{}[{}/{} rows] ",
        title,
        (offset + visible).min(table.rows.len()),
        table.rows.len()
    );
    let widget = TableWidget::new(rows, constraints)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(border_style));
    f.render_widget(widget, area);
}

/// Short columns get their content width; the rest share what remains.
fn column_widths(table: &Table, inner_width: usize) -> (Vec<Constraint>, Vec<usize>) {
    let n = table.columns.len().max(1);
    let natural: Vec<usize> = (0..table.columns.len())
        .map(|i| {
            table
                .rows
                .iter()
                .map(|r| r.get(i).to_string().chars().count())
                .chain(std::iter::once(table.columns[i].chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let fair = (inner_width / n).max(3);
    let fixed: usize = natural.iter().filter(|w| **w <= fair).sum();
    let wide = natural.iter().filter(|w| **w > fair).count().max(1);
    let share = (inner_width.saturating_sub(fixed + n) / wide).max(3);

    let widths: Vec<usize> = natural
        .iter()
        .map(|w| if *w <= fair { *w } else { share })
        .collect();
    let constraints = widths.iter().map(|w| Constraint::Length(*w as u16)).collect();
    (constraints, widths)
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(visible_lines)
        .map(|l| {
            let color = match l.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                _ => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.time, l.level);
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let block = Block::default().title(" Log ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let key = Style::default().fg(Color::Yellow);
    let off = Style::default().fg(Color::DarkGray);
    let line = Line::from(vec![
        Span::styled("  [u]", if state.job_active() { off } else { key }),
        Span::raw("pload  "),
        Span::styled("[d]", if state.download_ready() { key } else { off }),
        Span::raw("ownload  "),
        Span::styled("[i]", key),
        Span::raw("nstruction  "),
        Span::styled("[Tab]", key),
        Span::raw(" focus  "),
        Span::styled("[j/k]", key),
        Span::raw(" scroll  "),
        Span::styled("[q]", key),
        Span::raw("uit"),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_prompt(f: &mut Frame, state: &AppState) {
    let Some(prompt) = &state.prompt else { return };
    let area = centered_rect(70, 3, f.area());
    let block = Block::default()
        .title(prompt.title())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let text = format!("{}\u{258f}", prompt.buffer); // show cursor
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_dialog(f: &mut Frame, state: &AppState) {
    let Some(dialog) = &state.dialog else { return };
    let color = match dialog.kind {
        DialogKind::Info => Color::Green,
        DialogKind::Error => Color::Red,
    };
    let area = centered_rect(60, 7, f.area());
    let block = Block::default()
        .title(format!(" {} ", dialog.title))
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let lines = vec![
        Line::from(dialog.message.clone()),
        Line::from(""),
        Line::from(Span::styled("[Enter] OK", Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = (u32::from(r.width) * u32::from(percent_x) / 100) as u16;
    Rect {
        x: r.x + (r.width.saturating_sub(width)) / 2,
        y: r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height: height.min(r.height),
    }
}

fn truncate_with_ellipsis(s: &str, max: usize) -> Cow<'_, str> {
    if s.chars().count() <= max {
        Cow::Borrowed(s)
    } else if max <= 1 {
        Cow::Owned("…".chars().take(max).collect())
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        Cow::Owned(format!("{}…", kept))
    }
}
