//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, Paragraph};

use super::runtime::App;
use super::style;

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let load_rows = u16::try_from(app.engine().loads().len()).unwrap_or(u16::MAX);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                          // header
            Constraint::Min(10),                            // chart
            Constraint::Length(3),                          // SOC gauge
            Constraint::Length(load_rows.saturating_add(4)), // loads and faults
            Constraint::Length(1),                          // footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_chart(frame, app, chunks[1]);
    render_soc_gauge(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_footer(frame, chunks[4]);
}

/// Header bar: scenario name, step progress, clock, speed, run state.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (state_icon, state_label) = if app.is_finished() {
        ("■", "DONE")
    } else if app.paused {
        ("‖", "PAUSED")
    } else {
        ("▶", "RUNNING")
    };
    let hour = app.last_record().map_or(0.0, |r| r.hour_of_day);

    let header = Line::from(vec![
        Span::styled(
            " MICROGRID-SIM ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            app.scenario_name(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " │ t={}/{} │ {:05.2}h │ {}ms │ {} {} ",
            app.completed_steps(),
            app.total_steps(),
            hour,
            app.tick_interval_ms(),
            state_icon,
            state_label,
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Solar output vs demand chart over elapsed hours.
fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let hours = |r: &crate::sim::StepRecord| r.timestamp_s as f64 / 3600.0;
    let solar_data: Vec<(f64, f64)> = app
        .recent()
        .iter()
        .map(|r| (hours(r), r.solar_output_w))
        .collect();
    let demand_data: Vec<(f64, f64)> = app
        .recent()
        .iter()
        .map(|r| (hours(r), r.total_demand))
        .collect();

    let y_bounds = style::auto_bounds_y(&solar_data, &demand_data);
    let x_lo = solar_data.first().map_or(0.0, |p| p.0);
    let x_hi = solar_data.last().map_or(1.0, |p| p.0).max(x_lo + 0.1);

    let datasets = vec![
        Dataset::default()
            .name("Solar")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::SOLAR_COLOR))
            .data(&solar_data),
        Dataset::default()
            .name("Demand")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(style::DEMAND_COLOR))
            .data(&demand_data),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(" Solar Output vs Demand ")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("h")
                .bounds([x_lo, x_hi])
                .labels(vec![format!("{x_lo:.1}"), format!("{x_hi:.1}")]),
        )
        .y_axis(
            Axis::default()
                .title("W")
                .bounds(y_bounds)
                .labels(vec![
                    format!("{:.0}", y_bounds[0]),
                    format!("{:.0}", y_bounds[1]),
                ]),
        );

    frame.render_widget(chart, area);
}

/// Battery SOC gauge with reserve-mode indicator.
fn render_soc_gauge(frame: &mut Frame, app: &App, area: Rect) {
    let soc = app.battery_soc();
    let reserve = app.reserve_soc();
    let in_reserve = app.last_record().is_some_and(|r| r.reserve_mode);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(16)])
        .split(area);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" SOC (reserve {:.0}%) ", reserve * 100.0))
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(style::soc_color(soc, reserve)))
        .ratio(soc.clamp(0.0, 1.0))
        .label(format!("{:.1}%", soc * 100.0));
    frame.render_widget(gauge, chunks[0]);

    let (label, color) = if in_reserve {
        ("RESERVE", style::SOC_LOW)
    } else {
        ("", style::FOOTER_FG)
    };
    let indicator = Paragraph::new(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(indicator, chunks[1]);
}

/// Load states, power flows, and active faults.
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(r) = app.last_record() {
        lines.push(Line::from(format!(
            "  solar→loads {:>7.1} W   battery→loads {:>7.1} W   solar→battery {:>7.1} W",
            r.power_from_solar, r.power_from_battery, r.power_to_battery,
        )));
        let faults = if r.active_faults.is_empty() {
            "none".to_string()
        } else {
            r.fault_descriptions().join("; ")
        };
        lines.push(Line::from(Span::styled(
            format!("  faults: {faults}"),
            Style::default().fg(if r.active_faults.is_empty() {
                style::FOOTER_FG
            } else {
                style::ALERT
            }),
        )));
    } else {
        lines.push(Line::from("  Waiting for first step..."));
    }

    for load in app.engine().loads() {
        let (state, color) = if load.is_active() {
            ("ON  ", style::LOAD_ON)
        } else {
            ("SHED", style::ALERT)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  [{state}] "), Style::default().fg(color)),
            Span::raw(format!(
                "{:<24} {:>7.1} W  {:<10} shed {}",
                load.name(),
                load.power_draw_w(),
                load.priority_label(),
                load.shed_count()
            )),
        ]));
    }

    let block = Block::default().title(" Loads ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  Space:Pause  +/-:Speed  1/2/3:Preset  r:Restart",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
