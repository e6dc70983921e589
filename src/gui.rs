use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use crate::app::{App, InputField};
use crate::view::{ChartSeries, DashboardView, ForecastView, TableRow};
use chrono::TimeZone;

// ──────────────────────────────────────────────────────────────────────────────
// Color Palette
// ──────────────────────────────────────────────────────────────────────────────

const ACCENT_BLUE: egui::Color32 = egui::Color32::from_rgb(59, 130, 246);
const ACCENT_GREEN: egui::Color32 = egui::Color32::from_rgb(34, 197, 94);
const ACCENT_RED: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);
const ACCENT_YELLOW: egui::Color32 = egui::Color32::from_rgb(250, 204, 21);
const ACCENT_CYAN: egui::Color32 = egui::Color32::from_rgb(34, 211, 238);

const BG_DARK: egui::Color32 = egui::Color32::from_rgb(15, 15, 20);
const BG_CARD: egui::Color32 = egui::Color32::from_rgb(24, 24, 32);
const BG_ELEVATED: egui::Color32 = egui::Color32::from_rgb(32, 32, 44);
const TEXT_PRIMARY: egui::Color32 = egui::Color32::from_rgb(226, 232, 240);
const TEXT_SECONDARY: egui::Color32 = egui::Color32::from_rgb(148, 163, 184);
const BORDER_SUBTLE: egui::Color32 = egui::Color32::from_rgb(51, 51, 68);

pub struct GuiApp {
    app: App,
}

impl GuiApp {
    /// Wraps the shared state and kicks off the first fetch.
    pub fn new(mut app: App) -> Self {
        app.trigger_fetch();
        Self { app }
    }

    fn apply_theme(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();

        style.visuals.window_rounding = egui::Rounding::same(8.0);
        style.visuals.widgets.noninteractive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);

        style.visuals.dark_mode = true;
        style.visuals.panel_fill = BG_DARK;
        style.visuals.window_fill = BG_CARD;
        style.visuals.faint_bg_color = BG_ELEVATED;

        style.visuals.widgets.noninteractive.bg_fill = BG_CARD;
        style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, TEXT_SECONDARY);
        style.visuals.widgets.inactive.bg_fill = BG_ELEVATED;
        style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, TEXT_PRIMARY);
        style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(45, 45, 60);
        style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
        style.visuals.widgets.active.bg_fill = ACCENT_BLUE;
        style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);

        style.visuals.selection.bg_fill = ACCENT_BLUE.linear_multiply(0.4);
        style.visuals.selection.stroke = egui::Stroke::new(1.0, ACCENT_BLUE);

        style.spacing.item_spacing = egui::vec2(8.0, 6.0);

        ctx.set_style(style);
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        Self::apply_theme(ctx);
        self.app.tick();

        // ── Top Bar ──
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Stock Market Dashboard")
                    .size(18.0)
                    .strong()
                    .color(ACCENT_BLUE));
                ui.add_space(4.0);
                ui.label(egui::RichText::new("Daily history and next-day trend")
                    .size(11.0)
                    .color(TEXT_SECONDARY));
            });
            ui.add_space(4.0);
        });

        // ── Sidebar ──
        egui::SidePanel::left("inputs")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| self.render_sidebar(ui));

        // ── Main Content ──
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.app.is_loading() {
                render_centered_status(ui, "Fetching Market Data...");
                ctx.request_repaint();
                return;
            }
            match self.app.view.clone() {
                Some(DashboardView::NoData { warning, .. }) => render_warning(ui, &warning),
                Some(view @ DashboardView::Ready { .. }) => self.render_dashboard(ui, &view),
                None => {}
            }
        });
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Panels
// ──────────────────────────────────────────────────────────────────────────────

impl GuiApp {
    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        section_header(ui, "User Input");

        let mut submitted = false;
        for field in [InputField::Symbol, InputField::Start, InputField::End] {
            ui.label(egui::RichText::new(field.label()).size(11.0).color(TEXT_SECONDARY));
            let text = match field {
                InputField::Symbol => &mut self.app.inputs.symbol,
                InputField::Start => &mut self.app.inputs.start,
                InputField::End => &mut self.app.inputs.end,
            };
            let response = ui.add(
                egui::TextEdit::singleline(text)
                    .desired_width(f32::INFINITY)
                    .hint_text(if field == InputField::Symbol { "AAPL" } else { "YYYY-MM-DD" }),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submitted = true;
            }
            ui.add_space(4.0);
        }

        ui.add_space(8.0);
        let retry = ui.add_enabled(
            !self.app.is_loading(),
            egui::Button::new(egui::RichText::new("Retry Fetch").size(13.0))
                .fill(ACCENT_BLUE)
                .rounding(egui::Rounding::same(6.0))
                .min_size(egui::vec2(ui.available_width(), 28.0)),
        );
        if retry.clicked() || submitted {
            self.app.trigger_fetch();
        }

        if let Some(err) = &self.app.error_msg {
            ui.add_space(8.0);
            ui.label(egui::RichText::new(err).size(11.0).color(ACCENT_RED));
        }
        if let Some(status) = &self.app.status_msg {
            ui.add_space(8.0);
            ui.label(egui::RichText::new(status).size(11.0).color(ACCENT_GREEN));
        }
    }

    fn render_dashboard(&mut self, ui: &mut egui::Ui, view: &DashboardView) {
        let DashboardView::Ready {
            heading,
            shape_label,
            columns,
            tail,
            chart,
            ..
        } = view
        else {
            return;
        };

        let mut download_clicked = false;
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Frame::none()
                .fill(BG_CARD)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(heading)
                            .size(20.0)
                            .strong()
                            .color(ACCENT_CYAN));
                        ui.add_space(12.0);
                        ui.label(egui::RichText::new(shape_label)
                            .size(12.0)
                            .color(TEXT_SECONDARY));
                    });
                });

            ui.add_space(6.0);
            render_table(ui, columns, tail);

            ui.add_space(8.0);
            section_header(ui, &chart.title);
            render_chart(ui, chart);

            ui.add_space(8.0);
            download_clicked = ui
                .add(
                    egui::Button::new(egui::RichText::new("Download CSV").size(13.0))
                        .rounding(egui::Rounding::same(6.0)),
                )
                .clicked();

            if let Some(fc) = view.forecast() {
                ui.add_space(12.0);
                render_forecast(ui, fc);
            }
        });

        if download_clicked {
            self.app.export_csv();
        }
    }
}

fn render_centered_status(ui: &mut egui::Ui, message: &str) {
    let available = ui.available_size();
    ui.vertical_centered(|ui| {
        ui.add_space(available.y * 0.3);
        ui.label(egui::RichText::new(message).size(16.0).color(TEXT_PRIMARY));
        ui.add_space(12.0);
        ui.spinner();
    });
}

fn render_warning(ui: &mut egui::Ui, warning: &str) {
    egui::Frame::none()
        .fill(ACCENT_YELLOW.linear_multiply(0.15))
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, ACCENT_YELLOW))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(warning).size(14.0).color(ACCENT_YELLOW));
        });
}

fn render_table(ui: &mut egui::Ui, columns: &[String], tail: &[TableRow]) {
    egui::Frame::none()
        .fill(BG_CARD)
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            egui::Grid::new("tail_table")
                .striped(true)
                .min_col_width(80.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("Date").strong().color(TEXT_SECONDARY));
                    for column in columns {
                        ui.label(egui::RichText::new(column).strong().color(TEXT_SECONDARY));
                    }
                    ui.end_row();

                    for row in tail {
                        ui.label(egui::RichText::new(&row.date).color(TEXT_PRIMARY));
                        for value in row.values {
                            ui.label(egui::RichText::new(format!("{:.2}", value)).color(TEXT_PRIMARY));
                        }
                        ui.end_row();
                    }
                });
        });
}

fn render_chart(ui: &mut egui::Ui, chart: &ChartSeries) {
    egui::Frame::none()
        .fill(BG_CARD)
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            let plot = Plot::new("close_chart")
                .x_axis_formatter(|x, _range| {
                    chrono::Utc.timestamp_opt(x.value as i64, 0)
                        .map(|dt| dt.format("%b %d").to_string())
                        .single()
                        .unwrap_or_default()
                })
                .label_formatter(|_name, value| {
                    let date = chrono::Utc.timestamp_opt(value.x as i64, 0)
                        .map(|dt| dt.format("%Y-%m-%d").to_string())
                        .single()
                        .unwrap_or_default();
                    format!("Date: {}\nClose: ${:.2}", date, value.y)
                })
                .y_axis_label("Close Price")
                .view_aspect(2.5)
                .allow_drag(true)
                .allow_zoom(true);

            let points: PlotPoints = chart
                .points
                .iter()
                .map(|p| [p.time as f64, p.close])
                .collect();

            plot.show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .name("Close")
                        .color(ACCENT_CYAN)
                        .width(1.8),
                );
            });
        });
}

fn render_forecast(ui: &mut egui::Ui, fc: &ForecastView) {
    section_header(ui, &fc.heading);
    ui.horizontal(|ui| {
        summary_card(ui, "Predicted Price", &fc.predicted_label, ACCENT_GREEN);
        summary_card(ui, "Lower", &format!("${:.2}", fc.lower), TEXT_PRIMARY);
        summary_card(ui, "Upper", &format!("${:.2}", fc.upper), TEXT_PRIMARY);
    });
    ui.label(egui::RichText::new(&fc.range_label).size(11.0).color(TEXT_SECONDARY));
}

// ──────────────────────────────────────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────────────────────────────────────

fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.label(egui::RichText::new(text)
        .size(13.0)
        .strong()
        .color(TEXT_PRIMARY));
    ui.add_space(4.0);
}

fn summary_card(ui: &mut egui::Ui, label: &str, value: &str, color: egui::Color32) {
    egui::Frame::none()
        .fill(BG_CARD)
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_min_width(100.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(label)
                    .size(10.0)
                    .color(TEXT_SECONDARY));
                ui.label(egui::RichText::new(value)
                    .size(20.0)
                    .strong()
                    .color(color));
            });
        });
}
