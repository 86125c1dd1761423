//! CS Adjust - Graphical User Interface
//!
//! Pick the standards table, the instrument result export and the report
//! file, then start the monitor. The recomputed table is shown as it updates,
//! with the concentration column highlighted.

use aspect_cs_adjust::monitor::DEFAULT_THRESHOLD;
use aspect_cs_adjust::settings::{load_saved_paths, settings_path};
use aspect_cs_adjust::{Monitor, MonitorConfig, OutputRow, PollEvent, WatchPaths};
use iced::widget::{button, column, container, row, rule, scrollable, text, text_input};
use iced::{Center, Color, Element, Fill, Task, Theme};
use std::path::PathBuf;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .theme(App::theme)
        .centered()
        .run()
}

const HIGHLIGHT: Color = Color::from_rgb(0.4, 0.9, 0.4);
const DIM: Color = Color::from_rgb(0.6, 0.6, 0.6);
const COLUMN_WIDTHS: [f32; 10] = [60.0, 140.0, 120.0, 130.0, 40.0, 80.0, 70.0, 90.0, 100.0, 80.0];

// ============================================================================
// App State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Standards,
    Results,
    Report,
}

struct App {
    standards: String,
    results: String,
    report: String,

    monitor: Option<Monitor>,
    /// Incremented on every start; events from older runs are ignored
    run_id: u64,
    counter: u32,
    threshold: u32,
    status_text: String,
    last_update: Option<String>,
    rows: Vec<OutputRow>,
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn new() -> (Self, Task<Message>) {
        let saved = load_saved_paths();
        (
            App {
                standards: saved.standards.display().to_string(),
                results: saved.results.display().to_string(),
                report: saved.report.display().to_string(),
                monitor: None,
                run_id: 0,
                counter: 0,
                threshold: DEFAULT_THRESHOLD,
                status_text: String::new(),
                last_update: None,
                rows: Vec::new(),
            },
            Task::none(),
        )
    }

    fn is_running(&self) -> bool {
        self.monitor.is_some()
    }

    fn paths(&self) -> WatchPaths {
        WatchPaths {
            standards: PathBuf::from(self.standards.trim()),
            report: PathBuf::from(self.report.trim()),
            results: PathBuf::from(self.results.trim()),
        }
    }

    fn start(&mut self) -> Task<Message> {
        let mut config = MonitorConfig::new(self.paths());
        config.threshold = self.threshold;
        config.settings_file = settings_path();

        let (tx, rx) = futures::channel::mpsc::unbounded();
        match Monitor::start(config, tx) {
            Ok(monitor) => {
                self.monitor = Some(monitor);
                self.run_id += 1;
                self.counter = 0;
                self.status_text = "Running".to_string();
                let run = self.run_id;
                Task::run(rx, move |event| Message::Poll(run, event))
            }
            Err(e) => {
                self.status_text = match e {
                    aspect_cs_adjust::Error::MissingPath(kind) => {
                        format!("Please specify the {} file.", kind)
                    }
                    e => format!("Error: {}", e),
                };
                Task::none()
            }
        }
    }

    fn stop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.counter = 0;
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum Message {
    StandardsChanged(String),
    ResultsChanged(String),
    ReportChanged(String),
    BrowseFile(FileKind),
    FileSelected(FileKind, Option<PathBuf>),
    ToggleRun,
    Poll(u64, PollEvent),
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StandardsChanged(v) => {
                self.standards = v;
                Task::none()
            }
            Message::ResultsChanged(v) => {
                self.results = v;
                Task::none()
            }
            Message::ReportChanged(v) => {
                self.report = v;
                Task::none()
            }

            Message::BrowseFile(kind) => Task::perform(
                async move {
                    let dialog = rfd::AsyncFileDialog::new().add_filter("CSV files", &["csv"]);
                    let file = match kind {
                        FileKind::Standards => {
                            dialog.set_title("Select standards CSV file").pick_file().await
                        }
                        FileKind::Results => {
                            dialog.set_title("Select result CSV file").pick_file().await
                        }
                        FileKind::Report => {
                            dialog
                                .set_title("Select report CSV file")
                                .set_file_name("report.csv")
                                .save_file()
                                .await
                        }
                    };
                    (kind, file.map(|f| f.path().to_path_buf()))
                },
                |(kind, path)| Message::FileSelected(kind, path),
            ),
            Message::FileSelected(kind, path) => {
                if let Some(p) = path {
                    let path_str = p.display().to_string();
                    match kind {
                        FileKind::Standards => self.standards = path_str,
                        FileKind::Results => self.results = path_str,
                        FileKind::Report => self.report = path_str,
                    }
                }
                Task::none()
            }

            Message::ToggleRun => {
                if self.is_running() {
                    self.stop();
                    self.status_text = "Stopped.".to_string();
                    Task::none()
                } else {
                    self.start()
                }
            }

            Message::Poll(run, event) => {
                if run != self.run_id || !self.is_running() {
                    return Task::none();
                }
                match event {
                    PollEvent::Tick(n) => self.counter = n,
                    PollEvent::OutputReady(cycle) => {
                        self.status_text = if cycle.written {
                            format!("Report updated ({} rows)", cycle.rows.len())
                        } else {
                            format!("Recomputed {} rows, report unchanged", cycle.rows.len())
                        };
                        self.last_update = Some(cycle.finished_at.format("%H:%M:%S").to_string());
                        self.rows = cycle.rows;
                    }
                    PollEvent::Unchanged => {
                        self.status_text = "No new results".to_string();
                    }
                    PollEvent::Failed(e) => {
                        self.stop();
                        self.status_text = format!("Stopped on error: {}", e);
                    }
                    PollEvent::Stopped => {
                        self.stop();
                        self.status_text = "Stopped.".to_string();
                    }
                }
                Task::none()
            }
        }
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let disabled = self.is_running();

        let form = column![
            self.file_picker(FileKind::Standards),
            self.file_picker(FileKind::Results),
            self.file_picker(FileKind::Report),
        ]
        .spacing(10);

        let run_label = if disabled { "Stop" } else { "Start" };
        let run_button = button(text(run_label).size(14))
            .on_press(Message::ToggleRun)
            .style(if disabled {
                button::danger
            } else {
                button::primary
            });

        let countdown = if disabled {
            text(format!("{}", self.threshold.saturating_sub(self.counter))).size(28)
        } else {
            text("0").size(28).color(DIM)
        };

        let updated = match &self.last_update {
            Some(t) => format!("Last update {}", t),
            None => String::new(),
        };

        let controls = row![
            run_button,
            countdown,
            text(&self.status_text).size(13).width(Fill),
            text(updated).size(13).color(DIM),
        ]
        .spacing(16)
        .align_y(Center);

        column![
            form,
            controls,
            rule::horizontal(1),
            self.view_table(),
        ]
        .spacing(16)
        .padding(20)
        .into()
    }

    fn view_table(&self) -> Element<'_, Message> {
        let header = row(OutputRow::HEADERS
            .into_iter()
            .zip(COLUMN_WIDTHS)
            .map(|(h, w)| text(h).size(13).width(w).into()))
        .spacing(6);

        if self.rows.is_empty() {
            return column![header, text("-- no results yet --").size(13).color(DIM)]
                .spacing(6)
                .into();
        }

        let body = column(self.rows.iter().map(|r| {
            row(r
                .fields()
                .into_iter()
                .zip(COLUMN_WIDTHS)
                .enumerate()
                .map(|(i, (value, w))| {
                    let cell = text(value).size(13).width(w);
                    if i == OutputRow::CONCENTRATION_COLUMN {
                        cell.color(HIGHLIGHT).into()
                    } else {
                        cell.into()
                    }
                }))
            .spacing(6)
            .into()
        }))
        .spacing(2);

        column![
            header,
            rule::horizontal(1),
            container(scrollable(body)).width(Fill).height(Fill),
        ]
        .spacing(6)
        .into()
    }
}

// ============================================================================
// Helper widgets
// ============================================================================

impl FileKind {
    fn label(self) -> &'static str {
        match self {
            FileKind::Standards => "Standards:",
            FileKind::Results => "Results:",
            FileKind::Report => "Report:",
        }
    }

    fn on_change(self) -> fn(String) -> Message {
        match self {
            FileKind::Standards => Message::StandardsChanged,
            FileKind::Results => Message::ResultsChanged,
            FileKind::Report => Message::ReportChanged,
        }
    }
}

impl App {
    fn path_text(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Standards => &self.standards,
            FileKind::Results => &self.results,
            FileKind::Report => &self.report,
        }
    }

    /// One path row. Editing and browsing are locked while a run is active.
    fn file_picker(&self, kind: FileKind) -> Element<'_, Message> {
        let locked = self.is_running();
        let input = text_input("Select file...", self.path_text(kind))
            .on_input_maybe((!locked).then(|| kind.on_change()));
        let browse = button(text("Browse").size(13))
            .on_press_maybe((!locked).then_some(Message::BrowseFile(kind)));

        row![text(kind.label()).width(110), input.width(Fill), browse]
            .spacing(10)
            .align_y(Center)
            .into()
    }
}
