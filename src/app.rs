use crate::config::{DATE_FORMAT, ForecastSettings};
use crate::error::DashboardError;
use crate::export;
use crate::pipeline::{self, DashboardReport, DashboardRequest};
use crate::provider::MarketDataProvider;
use crate::view::DashboardView;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Loading,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputField {
    Symbol,
    Start,
    End,
}

impl InputField {
    pub fn next(self) -> Self {
        match self {
            Self::Symbol => Self::Start,
            Self::Start => Self::End,
            Self::End => Self::Symbol,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Symbol => "Stock Symbol",
            Self::Start => "Start Date",
            Self::End => "End Date",
        }
    }
}

/// Raw text of the three input widgets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inputs {
    pub symbol: String,
    pub start: String,
    pub end: String,
}

impl From<&DashboardRequest> for Inputs {
    fn from(request: &DashboardRequest) -> Self {
        Self {
            symbol: request.symbol.clone(),
            start: request.start.format(DATE_FORMAT).to_string(),
            end: request.end.format(DATE_FORMAT).to_string(),
        }
    }
}

impl Inputs {
    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::Symbol => &self.symbol,
            InputField::Start => &self.start,
            InputField::End => &self.end,
        }
    }

    fn get_mut(&mut self, field: InputField) -> &mut String {
        match field {
            InputField::Symbol => &mut self.symbol,
            InputField::Start => &mut self.start,
            InputField::End => &mut self.end,
        }
    }
}

type FetchResult = Result<(DashboardReport, DashboardView), DashboardError>;

/// Front-end state shared by the terminal and desktop dashboards.
pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub inputs: Inputs,
    pub focus: InputField,
    /// Keystrokes go to the focused field while set.
    pub editing: bool,
    pub view: Option<DashboardView>,
    pub report: Option<DashboardReport>,
    pub error_msg: Option<String>,
    pub status_msg: Option<String>,
    provider: Arc<dyn MarketDataProvider>,
    settings: ForecastSettings,
    download_dir: PathBuf,
    fetch_rx: Option<mpsc::Receiver<FetchResult>>,
}

impl App {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        initial: &DashboardRequest,
        settings: ForecastSettings,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            should_quit: false,
            state: AppState::Idle,
            inputs: Inputs::from(initial),
            focus: InputField::Symbol,
            editing: true,
            view: None,
            report: None,
            error_msg: None,
            status_msg: None,
            provider,
            settings,
            download_dir,
            fetch_rx: None,
        }
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        while !self.should_quit {
            self.tick();
            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if self.editing {
            match code {
                KeyCode::Char(c) => self.inputs.get_mut(self.focus).push(c),
                KeyCode::Backspace => {
                    self.inputs.get_mut(self.focus).pop();
                }
                KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
                KeyCode::Enter => {
                    self.trigger_fetch();
                    if self.state == AppState::Loading {
                        self.editing = false;
                    }
                }
                KeyCode::Esc => {
                    if self.view.is_some() {
                        self.editing = false;
                    } else {
                        self.should_quit = true;
                    }
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.trigger_fetch(),
            KeyCode::Char('d') => self.export_csv(),
            KeyCode::Char('e') => self.editing = true,
            _ => {}
        }
    }

    /// Starts a fetch for the current inputs. Any fetch still in flight is
    /// abandoned; its result is dropped when it arrives.
    pub fn trigger_fetch(&mut self) {
        let request = match DashboardRequest::parse(
            &self.inputs.symbol,
            &self.inputs.start,
            &self.inputs.end,
        ) {
            Ok(request) => request,
            Err(e) => {
                self.error_msg = Some(e.to_string());
                return;
            }
        };

        info!("Fetching {} ({}..{})", request.symbol, request.start, request.end);
        self.inputs.symbol = request.symbol.clone();
        self.state = AppState::Loading;
        self.error_msg = None;
        self.status_msg = None;

        let (tx, rx) = mpsc::channel(1);
        self.fetch_rx = Some(rx);
        let provider = self.provider.clone();
        let settings = self.settings;

        tokio::spawn(async move {
            let result = match pipeline::run_dashboard(provider.as_ref(), &request, &settings).await {
                Ok(report) => DashboardView::from_report(&report)
                    .map(|view| (report, view))
                    .map_err(DashboardError::from),
                Err(e) => Err(e),
            };
            let _ = tx.send(result).await;
        });
    }

    /// Collects a finished fetch, if any. Call once per frame.
    pub fn tick(&mut self) {
        let Some(rx) = &mut self.fetch_rx else {
            return;
        };
        let Ok(result) = rx.try_recv() else {
            return;
        };
        self.fetch_rx = None;
        self.apply(result);
    }

    /// Waits for the pending fetch to finish.
    #[cfg(test)]
    pub async fn wait_for_fetch(&mut self) {
        if let Some(rx) = &mut self.fetch_rx {
            if let Some(result) = rx.recv().await {
                self.fetch_rx = None;
                self.apply(result);
            }
        }
    }

    fn apply(&mut self, result: FetchResult) {
        match result {
            Ok((report, view)) => {
                self.report = Some(report);
                self.view = Some(view);
                self.error_msg = None;
            }
            Err(e) => {
                error!("Fetch failed: {}", e);
                self.report = None;
                self.view = None;
                self.error_msg = Some(e.to_string());
            }
        }
        self.state = AppState::Ready;
    }

    pub fn is_loading(&self) -> bool {
        self.state == AppState::Loading
    }

    /// Writes the current series to `stock_data.csv` in the download directory.
    pub fn export_csv(&mut self) {
        let Some(series) = self.report.as_ref().and_then(|r| r.outcome.series()) else {
            self.status_msg = Some("Nothing to download".to_string());
            return;
        };

        match export::write_csv_file(series, &self.download_dir) {
            Ok(path) => self.status_msg = Some(format!("Saved {}", path.display())),
            Err(e) => {
                error!("CSV export failed: {}", e);
                self.error_msg = Some(e.to_string());
            }
        }
    }
}

pub fn default_download_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{StaticProvider, compound_frame, known_closes};

    fn app_with(frame: crate::data::RawFrame, dir: PathBuf) -> App {
        let request = DashboardRequest::parse("AAPL", "2024-01-01", "2024-03-01").unwrap();
        App::new(
            Arc::new(StaticProvider::new(frame)),
            &request,
            ForecastSettings::default(),
            dir,
        )
    }

    #[tokio::test]
    async fn test_fetch_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(compound_frame("AAPL", &known_closes()), dir.path().to_path_buf());

        app.trigger_fetch();
        assert!(app.is_loading());
        app.wait_for_fetch().await;

        assert_eq!(app.state, AppState::Ready);
        assert!(app.view.as_ref().and_then(|v| v.forecast()).is_some());

        app.export_csv();
        let written = std::fs::read_to_string(dir.path().join("stock_data.csv")).unwrap();
        assert_eq!(written.lines().count(), 41);
    }

    #[tokio::test]
    async fn test_invalid_inputs_do_not_fetch() {
        let mut app = app_with(crate::data::RawFrame::empty(), default_download_dir());
        app.inputs.start = "2024-05-01".to_string();
        app.inputs.end = "2024-04-01".to_string();

        app.trigger_fetch();
        assert_eq!(app.state, AppState::Idle);
        assert!(app.error_msg.as_deref().unwrap_or("").contains("before start date"));
    }

    #[tokio::test]
    async fn test_key_handling() {
        let mut app = app_with(crate::data::RawFrame::empty(), default_download_dir());
        assert!(app.editing);

        app.inputs.symbol.clear();
        for c in "msft".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focus, InputField::Start);
        app.handle_key(KeyCode::Backspace);
        assert_eq!(app.inputs.start, "2024-01-0");
        app.handle_key(KeyCode::Char('1'));

        app.handle_key(KeyCode::Enter);
        assert!(!app.editing);
        assert_eq!(app.inputs.symbol, "MSFT");
        app.wait_for_fetch().await;

        // 'q' types into the field while editing, quits otherwise.
        app.handle_key(KeyCode::Char('e'));
        app.handle_key(KeyCode::Char('q'));
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Esc);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_empty_result_has_nothing_to_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(crate::data::RawFrame::empty(), dir.path().to_path_buf());
        app.trigger_fetch();
        app.wait_for_fetch().await;

        assert!(matches!(app.view, Some(DashboardView::NoData { .. })));
        app.export_csv();
        assert!(!dir.path().join("stock_data.csv").exists());
    }
}
