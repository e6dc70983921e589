mod app;
mod config;
mod data;
mod error;
mod export;
mod forecast;
mod gui;
mod pipeline;
mod provider;
mod tui;
mod ui;
mod view;
mod webui;

use app::App;
use clap::Parser;
use config::ForecastSettings;
use pipeline::DashboardRequest;
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stock Market Dashboard: daily history, CSV export and a next-day linear trend forecast",
    after_help = "EXAMPLES:
    # Terminal dashboard for AAPL since 2023-01-01
    cargo run --release

    # Desktop window for another ticker and range
    cargo run --release -- --gui --ticker MSFT --start 2024-01-01 --end 2024-06-30

    # Browser dashboard on port 3000
    cargo run --release -- --webui --port 3000

    # Offline data
    STOCK_DASHBOARD_DATA_PROVIDER=mock cargo run --release"
)]
struct Args {
    /// Launch in GUI mode
    #[arg(long)]
    gui: bool,

    /// Launch in WebUI mode
    #[arg(long)]
    webui: bool,

    /// WebUI server port
    #[arg(long, default_value_t = config::WEBUI_PORT)]
    port: u16,

    /// Initial stock symbol (default: AAPL)
    #[arg(long)]
    ticker: Option<String>,

    /// Initial start date, YYYY-MM-DD (default: 2023-01-01)
    #[arg(long)]
    start: Option<String>,

    /// Initial end date, YYYY-MM-DD (default: today)
    #[arg(long)]
    end: Option<String>,

    /// Forecast only when the series has more rows than this (default: 30)
    #[arg(long)]
    min_rows: Option<usize>,

    /// Half-width of the displayed prediction range in dollars (default: 1.25)
    #[arg(long)]
    margin: Option<f64>,
}

impl Args {
    fn initial_request(&self) -> Result<DashboardRequest, error::InputError> {
        let defaults = DashboardRequest::default_for_today();
        let start = match &self.start {
            Some(s) => s.clone(),
            None => defaults.start.format(config::DATE_FORMAT).to_string(),
        };
        let end = match &self.end {
            Some(s) => s.clone(),
            None => defaults.end.format(config::DATE_FORMAT).to_string(),
        };
        DashboardRequest::parse(self.ticker.as_deref().unwrap_or(&defaults.symbol), &start, &end)
    }
}

fn init_tracing(interactive_terminal: bool) {
    // The TUI owns stdout; only log there when explicitly asked to.
    if interactive_terminal && std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("stock_dashboard=info,wgpu_core=error,wgpu_hal=error")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(!args.gui && !args.webui);

    let request = match args.initial_request() {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid input: {}", e);
            eprintln!("{}", e);
            return Ok(());
        }
    };
    let settings = ForecastSettings::with_overrides(args.min_rows, args.margin);

    let mode = config::configured_data_provider_mode();
    let provider = match provider::provider_for(mode) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to initialize {} provider: {}", mode.as_str(), e);
            return Ok(());
        }
    };
    info!("Using {} data provider", provider.name());

    if args.webui {
        match webui::run_webui_server(args.port, provider, settings, request.clone()).await {
            Ok(_) => info!("WebUI exited."),
            Err(e) => error!("WebUI failed: {}", e),
        }
        return Ok(());
    }

    let app = App::new(provider, &request, settings, app::default_download_dir());

    if args.gui {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("Stock Market Dashboard")
                .with_inner_size([1200.0, 800.0]),
            ..Default::default()
        };
        eframe::run_native(
            "Stock Market Dashboard",
            options,
            Box::new(|_cc| Ok(Box::new(gui::GuiApp::new(app)))),
        ).map_err(|e| io::Error::other(e.to_string()))?;
        return Ok(());
    }

    let mut app = app;
    app.trigger_fetch();
    app.editing = false;

    let mut terminal = tui::init()?;
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
    }

    Ok(())
}
