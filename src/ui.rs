use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};
use crate::app::{App, AppState, InputField};
use crate::view::{ChartSeries, DashboardView, ForecastView, TableRow};

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(layout[1]);

    render_inputs(f, app, body[0]);

    match (&app.state, &app.view) {
        (AppState::Loading, _) => render_message(f, "Fetching market data...", Color::Gray, body[1]),
        (_, Some(DashboardView::NoData { warning, .. })) => {
            render_message(f, warning, Color::Yellow, body[1])
        }
        (_, Some(view @ DashboardView::Ready { .. })) => render_dashboard(f, view, body[1]),
        (_, None) => render_message(f, "Press Enter to load data", Color::Gray, body[1]),
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Stock Market Dashboard ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(
            match app.state {
                AppState::Idle => "Idle",
                AppState::Loading => "Loading",
                AppState::Ready => "Ready",
            },
            Style::default().fg(Color::Yellow),
        ),
    ];

    if let Some(series) = app.report.as_ref().and_then(|r| r.outcome.series()) {
        if let Some(last) = series.last() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                format!("{} ${:.2}", series.symbol, last.close),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ));
        }
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = if app.editing {
        "Tab: next field | Enter: fetch | Esc: back"
    } else {
        "r: retry | d: download CSV | e: edit | q/Esc: quit"
    };

    let mut spans = vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ];
    if let Some(err) = &app.error_msg {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(err.as_str(), Style::default().fg(Color::Red)));
    } else if let Some(status) = &app.status_msg {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Green)));
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn render_inputs(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    for (i, field) in [InputField::Symbol, InputField::Start, InputField::End].into_iter().enumerate() {
        let focused = app.editing && app.focus == field;
        let border = if focused { Color::Yellow } else { Color::DarkGray };
        let mut text = app.inputs.get(field).to_string();
        if focused {
            text.push('_');
        }
        let input = Paragraph::new(text)
            .style(Style::default().fg(Color::White))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(format!(" {} ", field.label())),
            );
        f.render_widget(input, chunks[i]);
    }
}

fn render_message(f: &mut Frame, msg: &str, color: Color, area: Rect) {
    let text = Paragraph::new(msg)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(text, area);
}

fn render_dashboard(f: &mut Frame, view: &DashboardView, area: Rect) {
    let DashboardView::Ready {
        heading,
        shape_label,
        columns,
        tail,
        chart,
        forecast,
        ..
    } = view
    else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(tail.len() as u16 + 4),
            Constraint::Min(8),
        ])
        .split(area);

    render_table(f, heading, shape_label, columns, tail, chunks[0]);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(chunks[1]);

    render_chart(f, chart, lower[0]);
    render_forecast(f, forecast.as_ref(), lower[1]);
}

fn render_table(
    f: &mut Frame,
    heading: &str,
    shape_label: &str,
    columns: &[String],
    tail: &[TableRow],
    area: Rect,
) {
    let header = Row::new(
        std::iter::once("Date".to_string())
            .chain(columns.iter().cloned())
            .map(|c| Cell::from(c).style(Style::default().fg(Color::Yellow))),
    );

    let rows = tail.iter().map(|row| {
        let mut cells = vec![Cell::from(row.date.clone())];
        cells.extend(row.values.iter().map(|v| Cell::from(format!("{:.2}", v))));
        Row::new(cells)
    });

    let widths = [Constraint::Length(12); 6];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", heading),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(format!(" {} ", shape_label)),
    );
    f.render_widget(table, area);
}

fn render_chart(f: &mut Frame, chart: &ChartSeries, area: Rect) {
    let points: Vec<(f64, f64)> = chart
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.close))
        .collect();

    let min_price = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_price = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let x_max = (points.len().max(2) - 1) as f64;

    let first = chart.points.first().map(|p| p.date.to_string()).unwrap_or_default();
    let last = chart.points.last().map(|p| p.date.to_string()).unwrap_or_default();

    let dataset = Dataset::default()
        .name("Close")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let widget = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(Span::styled(
                    format!(" {} ", chart.title),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .title("Close Price")
                .style(Style::default().fg(Color::Gray))
                .bounds([min_price * 0.98, max_price * 1.02])
                .labels(vec![
                    Span::styled(format!("{:.1}", min_price), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.1}", max_price), Style::default().fg(Color::Gray)),
                ]),
        );

    f.render_widget(widget, area);
}

fn render_forecast(f: &mut Frame, forecast: Option<&ForecastView>, area: Rect) {
    let lines = match forecast {
        Some(fc) => vec![
            Line::from(Span::styled(
                fc.heading.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Predicted Price: {}", fc.predicted_label),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(fc.range_label.as_str(), Style::default().fg(Color::Gray))),
        ],
        None => vec![Line::from(Span::styled(
            "Not enough history for a forecast",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Forecast "));
    f.render_widget(panel, area);
}
