use crate::theme::{self, icons, Theme};
use conveyor_core::view::{
    ConveyorView, ControlsView, DashboardView, KpiCard, OvenView, ProcessEventView,
    EMPTY_SEQUENCE_MESSAGE,
};
use conveyor_monitor::state::MonitorState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const LANE_BAR_WIDTH: usize = 16;

pub fn render(frame: &mut Frame, state: &MonitorState, endpoint: &str) {
    let size = frame.size();
    let theme = theme::theme();
    let view = state.view();
    let controls = state.controls();
    let flow = state.process_flow();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(8),
            Constraint::Length(12),
        ])
        .split(size);

    frame.render_widget(render_header(state, &controls, theme, endpoint), layout[0]);
    frame.render_widget(render_kpis(&view.kpis, theme), layout[1]);
    frame.render_widget(render_conveyor(&view.conveyor, theme), layout[2]);
    render_ovens(frame, &view, theme, layout[3]);
    frame.render_widget(render_process_flow(&flow, theme), layout[4]);
}

fn panel(title: String, theme: Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
}

fn key_hint(key: &str, label: &str, enabled: bool, theme: Theme) -> Vec<Span<'static>> {
    let (key_color, label_color) = if enabled {
        (theme.accent, theme.text)
    } else {
        (theme.border, theme.muted)
    };
    vec![
        Span::styled(format!("[{key}]"), Style::default().fg(key_color)),
        Span::styled(format!(" {label}  "), Style::default().fg(label_color)),
    ]
}

fn render_header(
    state: &MonitorState,
    controls: &ControlsView,
    theme: Theme,
    endpoint: &str,
) -> Paragraph<'static> {
    let connectivity = state.connectivity();
    let simulation = state.simulation();
    let run = simulation.requested();
    let mut status = vec![
        Span::styled("Backend: ", Style::default().fg(theme.muted)),
        Span::styled(
            connectivity.as_str().to_uppercase(),
            Style::default()
                .fg(theme::connectivity_color(theme, connectivity))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   Simulation: ", Style::default().fg(theme.muted)),
        Span::styled(
            run.as_str().to_uppercase(),
            Style::default()
                .fg(theme::run_color(theme, run))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if simulation.is_pending() && connectivity.is_connected() {
        status.push(Span::styled(" (awaiting update)", Style::default().fg(theme.muted)));
    }
    status.push(Span::styled(
        format!("   Speed: {:.2}s", state.speed_secs()),
        Style::default().fg(theme.muted),
    ));
    let stats = state.ingestor().stats();
    let last = state
        .ingestor()
        .last_update_at()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    status.push(Span::styled(
        format!("   Updates: {} (last {last})", stats.accepted),
        Style::default().fg(theme.muted),
    ));

    let mut hints = Vec::new();
    hints.extend(key_hint("s", "Start", controls.start_enabled, theme));
    hints.extend(key_hint("x", "Stop", controls.stop_enabled, theme));
    hints.extend(key_hint("r", "Reset", controls.reset_enabled, theme));
    hints.extend(key_hint("+/-", "Speed", controls.speed_enabled, theme));
    hints.extend(key_hint("q", "Quit", true, theme));

    let note = match (controls.banner, state.status_note()) {
        (Some(banner), _) => Span::styled(banner.to_string(), Style::default().fg(theme.critical)),
        (None, Some(note)) => Span::styled(note.to_string(), Style::default().fg(theme.muted)),
        (None, None) => Span::raw(""),
    };
    let mut second = hints;
    second.push(note);

    Paragraph::new(Text::from(vec![Line::from(status), Line::from(second)]))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(panel(format!("Conveyor Sequencing Monitor  {endpoint}"), theme))
}

fn render_kpis(cards: &[KpiCard], theme: Theme) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for card in cards {
        spans.push(Span::styled(
            format!("{}: ", card.label),
            Style::default().fg(theme.muted),
        ));
        spans.push(Span::styled(
            format!("{}   ", card.value),
            Style::default()
                .fg(theme.text)
                .add_modifier(Modifier::BOLD),
        ));
    }
    Paragraph::new(Line::from(spans))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(panel("KPIs".to_string(), theme))
}

fn render_conveyor(conveyor: &ConveyorView, theme: Theme) -> Paragraph<'static> {
    let summary = Line::from(vec![
        Span::styled("Current: ", Style::default().fg(theme.muted)),
        Span::styled(
            format!("{} {}", icons::VEHICLE, conveyor.current_label),
            Style::default()
                .fg(theme::paint(conveyor.current_color))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   Changes: {}", conveyor.color_changes),
            Style::default().fg(theme.text),
        ),
        Span::styled(
            format!("   Total Picks: {}", conveyor.total_picks),
            Style::default().fg(theme.text),
        ),
    ]);

    let sequence = if conveyor.sequence.is_empty() {
        Line::from(Span::styled(
            EMPTY_SEQUENCE_MESSAGE,
            Style::default().fg(theme.muted),
        ))
    } else {
        let last = conveyor.sequence.len() - 1;
        let spans: Vec<Span<'static>> = conveyor
            .sequence
            .iter()
            .enumerate()
            .map(|(idx, vehicle)| {
                let glyph = if idx == last { icons::LATEST } else { icons::VEHICLE };
                Span::styled(
                    format!("{glyph} "),
                    Style::default().fg(theme::paint(vehicle.color)),
                )
            })
            .collect();
        Line::from(spans)
    };

    let mut lines = vec![summary, sequence];
    if let Some(caption) = &conveyor.caption {
        lines.push(Line::from(Span::styled(
            caption.clone(),
            Style::default().fg(theme.muted),
        )));
    }
    Paragraph::new(Text::from(lines))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .wrap(Wrap { trim: true })
        .block(panel("Conveyor Sequence".to_string(), theme))
}

fn render_ovens(frame: &mut Frame, view: &DashboardView, theme: Theme, area: Rect) {
    if view.ovens.is_empty() {
        return;
    }
    let share = 100 / view.ovens.len() as u16;
    let constraints: Vec<Constraint> = view
        .ovens
        .iter()
        .map(|_| Constraint::Percentage(share))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (oven, column) in view.ovens.iter().zip(columns.iter()) {
        frame.render_widget(render_oven(oven, theme), *column);
    }
}

fn render_oven(oven: &OvenView, theme: Theme) -> Paragraph<'static> {
    let mut lines = Vec::with_capacity(oven.lanes.len() * 2);
    for lane in &oven.lanes {
        let filled = ((lane.fill_ratio.clamp(0.0, 1.0) * LANE_BAR_WIDTH as f64).round()) as usize;
        let status_color = theme::lane_status_color(theme, lane.status);
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<4}", lane.id),
                Style::default()
                    .fg(theme.text)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                icons::FILLED.repeat(filled),
                Style::default().fg(status_color),
            ),
            Span::styled(
                icons::UNFILLED.repeat(LANE_BAR_WIDTH - filled),
                Style::default().fg(theme.border),
            ),
            Span::styled(
                format!(" {:>6} {}", lane.occupancy, lane.status.as_str()),
                Style::default().fg(status_color),
            ),
        ]));
        let vehicles: Vec<Span<'static>> = if lane.vehicles.is_empty() {
            vec![Span::styled("    empty", Style::default().fg(theme.muted))]
        } else {
            std::iter::once(Span::raw("    "))
                .chain(lane.vehicles.iter().map(|vehicle| {
                    Span::styled(
                        icons::VEHICLE,
                        Style::default().fg(theme::paint(vehicle.color)),
                    )
                }))
                .collect()
        };
        lines.push(Line::from(vehicles));
    }
    Paragraph::new(Text::from(lines))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(panel(format!("{} ({})", oven.title, oven.lane_range), theme))
}

fn render_process_flow(flow: &[ProcessEventView], theme: Theme) -> Paragraph<'static> {
    let lines: Vec<Line<'static>> = if flow.is_empty() {
        vec![Line::from(Span::styled(
            "No process events yet.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        flow.iter()
            .map(|event| {
                let mut spans = vec![
                    Span::styled(
                        format!("{:<9}", event.time.as_deref().unwrap_or("--:--:--")),
                        Style::default().fg(theme.muted),
                    ),
                    Span::styled(
                        format!("{:<16}", event.label),
                        Style::default().fg(theme.text),
                    ),
                ];
                if let Some(vehicle) = &event.color {
                    spans.push(Span::styled(
                        format!("{} {} ({})", icons::VEHICLE, vehicle.code, vehicle.color.name),
                        Style::default().fg(theme::paint(vehicle.color)),
                    ));
                }
                Line::from(spans)
            })
            .collect()
    };
    Paragraph::new(Text::from(lines))
        .style(Style::default().fg(theme.text).bg(theme.bg))
        .block(panel("Process Flow".to_string(), theme))
}
