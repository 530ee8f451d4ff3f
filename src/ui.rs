use std::{io, sync::Arc, time::{Duration, Instant}};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Cell, Paragraph, Row, Table,
    },
    Terminal,
};

use crate::app::App;
use crate::config::MonitorConfig;
use crate::rate::IoRates;
use crate::state::IoUsage;
use crate::util::{format_bytes_total, format_rate};

pub fn run(usage: Arc<IoUsage>, config: &MonitorConfig, pid: u32) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(pid, config.interval_ms, config.history_len(), &usage);
    let res = run_app_loop(&mut terminal, app, &usage, Duration::from_millis(config.refresh_ms));

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn rate_row(label: &str, rates: IoRates) -> Row<'static> {
    Row::new(vec![
        Cell::from(label.to_string()),
        Cell::from(format!("{:.2}", rates.read_kb_per_sec)).style(Style::default().fg(Color::Red)),
        Cell::from(format!("{:.4}", rates.read_mb_per_sec)).style(Style::default().fg(Color::Red)),
        Cell::from(format!("{:.2}", rates.write_kb_per_sec)).style(Style::default().fg(Color::Blue)),
        Cell::from(format!("{:.4}", rates.write_mb_per_sec)).style(Style::default().fg(Color::Blue)),
    ])
    .height(1)
}

fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    usage: &IoUsage,
    tick_rate: Duration,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            // ============= whole screen layout ============
            let main_chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(0)
                .constraints([
                    Constraint::Length(16), // I/O rate box
                    Constraint::Min(6),     // rate table
                    Constraint::Length(1),  // status bar
                ].as_ref())
                .split(f.size());

            // ============= Top I/O Box ============
            let io_block = Block::default()
                .borders(Borders::ALL)
                .title(format!(" Process I/O [pid {}] ", app.pid))
                .border_type(ratatui::widgets::BorderType::Rounded)
                .border_style(Style::default().fg(Color::Cyan));
            f.render_widget(io_block.clone(), main_chunks[0]);

            let inner_area = io_block.inner(main_chunks[0]);
            let graph_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
                .split(inner_area);

            // ======== Left Graphs (Read/Write) ========
            let chart_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                .split(graph_chunks[0]);

            let max_read = app.read_history.iter().cloned().fold(1.0, f64::max);
            let max_write = app.write_history.iter().cloned().fold(1.0, f64::max);
            let x_limit = app.read_history.len() as f64;

            let read_canvas = Canvas::default()
                .block(Block::default().title(" Read ").title_style(Style::default().fg(Color::Red)))
                .marker(Marker::Braille)
                .x_bounds([0.0, x_limit])
                .y_bounds([0.0, max_read])
                .paint(|ctx| {
                    for (i, &val) in app.read_history.iter().enumerate() {
                        ctx.draw(&CanvasLine {
                            x1: i as f64,
                            y1: 0.0,
                            x2: i as f64,
                            y2: val,
                            color: Color::Red,
                        });
                    }
                });
            f.render_widget(read_canvas, chart_chunks[0]);

            let write_canvas = Canvas::default()
                .block(Block::default().title(" Write ").title_style(Style::default().fg(Color::Blue)))
                .marker(Marker::Braille)
                .x_bounds([0.0, x_limit])
                .y_bounds([0.0, max_write])
                .paint(|ctx| {
                    for (i, &val) in app.write_history.iter().enumerate() {
                        ctx.draw(&CanvasLine {
                            x1: i as f64,
                            y1: 0.0,
                            x2: i as f64,
                            y2: val,
                            color: Color::Blue,
                        });
                    }
                });
            f.render_widget(write_canvas, chart_chunks[1]);

            // textual stats on the right
            let text_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                .split(graph_chunks[1]);

            let current = app.sample_time();
            let (total_read, total_write) = app.totals();

            let read_text = vec![
                Line::from(vec![Span::raw("R "), Span::styled(format_rate(current.read_kb_per_sec), Style::default().fg(Color::White).add_modifier(Modifier::BOLD))]),
                Line::from(vec![Span::styled("  Peak: ", Style::default().fg(Color::DarkGray)), Span::raw(format_rate(app.peak_read.kb_per_sec))]),
                Line::from(vec![Span::styled("  Tot:  ", Style::default().fg(Color::DarkGray)), Span::raw(format_bytes_total(total_read))]),
            ];
            f.render_widget(Paragraph::new(read_text).block(Block::default().style(Style::default().fg(Color::Red))), text_chunks[0]);

            let write_text = vec![
                Line::from(vec![Span::raw("W "), Span::styled(format_rate(current.write_kb_per_sec), Style::default().fg(Color::White).add_modifier(Modifier::BOLD))]),
                Line::from(vec![Span::styled("  Peak: ", Style::default().fg(Color::DarkGray)), Span::raw(format_rate(app.peak_write.kb_per_sec))]),
                Line::from(vec![Span::styled("  Tot:  ", Style::default().fg(Color::DarkGray)), Span::raw(format_bytes_total(total_write))]),
            ];
            f.render_widget(Paragraph::new(write_text).block(Block::default().style(Style::default().fg(Color::Blue))), text_chunks[1]);

            // ============= Rate Table ============
            let header_cells = ["Window", "Read KB/s", "Read MB/s", "Write KB/s", "Write MB/s"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
            let header = Row::new(header_cells)
                .style(Style::default().bg(Color::Rgb(40, 40, 40)))
                .height(1)
                .bottom_margin(0);

            let rows = vec![
                rate_row("Last sample", app.sample_time()),
                rate_row("Since start", app.accumulated()),
            ];

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                ]
            )
            .header(header)
            .block(Block::default().title(" Throughput ").borders(Borders::ALL).border_type(ratatui::widgets::BorderType::Rounded));
            f.render_widget(table, main_chunks[1]);

            // ============ Bottom Status Bar ============
            let sample_state = if app.has_sample() {
                Span::styled(" SAMPLING ", Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD))
            } else {
                Span::styled(" WAITING ", Style::default().bg(Color::DarkGray).fg(Color::White).add_modifier(Modifier::BOLD))
            };

            let status_content = Line::from(vec![
                sample_state,
                Span::raw(format!(" every {} ms", app.interval_ms)),
                Span::raw(" | "),
                Span::styled("MAX R: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::raw(format!("{} ", format_rate(app.peak_read.kb_per_sec))),
                Span::styled(format!("(@{})", app.peak_read.at.format("%H:%M:%S")), Style::default().fg(Color::DarkGray)),
                Span::raw(" | "),
                Span::styled("MAX W: ", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
                Span::raw(format!("{} ", format_rate(app.peak_write.kb_per_sec))),
                Span::styled(format!("(@{})", app.peak_write.at.format("%H:%M:%S")), Style::default().fg(Color::DarkGray)),
                Span::raw(" | Press 'q' to quit"),
            ]);

            let status_bar = Paragraph::new(status_content)
                .style(Style::default().bg(Color::Rgb(20, 20, 20)));
            f.render_widget(status_bar, main_chunks[2]);
        })?;

        // Handle input
        let timeout = tick_rate.checked_sub(app.last_tick.elapsed()).unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') || key.code == KeyCode::Char('c') {
                    return Ok(());
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.on_tick(usage);
            app.last_tick = Instant::now();
        }
    }
}
