use crate::{
    case_map::CaseMap,
    config::{self, AppConfig},
    error::KeeperError,
    keeper::{self, FixOutcome, LoadOrderFiles},
    monitor::{DriftMonitor, MonitorEvent},
    reconcile::{self, ReconcileResult},
    snapshot,
};
use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};

const LOG_CAPACITY: usize = 200;
const TOAST_SECS: u64 = 4;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Plugins,
    Reference,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    AppDataPath,
    GamePath { app_data: String },
    CheckInterval { app_data: String, game: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    OverwriteReference,
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub kind: DialogKind,
    pub choice: DialogChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FixLoadOrder,
    CreateReference,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::FixLoadOrder => "Applying load order fix...",
            Operation::CreateReference => "Creating reference file...",
        }
    }
}

enum OperationMessage {
    Fixed(Result<FixOutcome, KeeperError>),
    ReferenceCreated(Result<usize, KeeperError>),
}

pub struct App {
    pub config: AppConfig,
    pub status: String,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub focus: Focus,
    pub plugins_scroll: usize,
    pub reference_scroll: usize,
    pub preview_scroll: usize,
    pub input_mode: InputMode,
    pub dialog: Option<Dialog>,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub ref_exists: bool,
    pub busy: Option<Operation>,
    pub monitor: DriftMonitor,
    pub files: LoadOrderFiles,
    pub preview: Option<ReconcileResult>,
    pub view_error: Option<String>,
    view_refreshed_at: Option<Instant>,
    operation_tx: Sender<OperationMessage>,
    operation_rx: Receiver<OperationMessage>,
    persist_config: bool,
}

impl App {
    pub fn initialize() -> Result<Self> {
        let config = AppConfig::load_or_create()?;
        let mut app = Self::with_config(config);
        app.persist_config = true;
        app.log_info(format!(
            "Load Order Keeper v{} started (settings: {})",
            env!("CARGO_PKG_VERSION"),
            config::config_path()?.display()
        ));
        if let Err(err) = app.config.validate() {
            app.log_warn(err.to_string());
        }
        Ok(app)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let (operation_tx, operation_rx) = mpsc::channel();
        let monitor = DriftMonitor::new(config.monitor_interval());
        let mut app = Self {
            ref_exists: snapshot::reference_exists(&config),
            config,
            status: String::new(),
            logs: Vec::new(),
            log_scroll: 0,
            focus: Focus::Plugins,
            plugins_scroll: 0,
            reference_scroll: 0,
            preview_scroll: 0,
            input_mode: InputMode::Normal,
            dialog: None,
            toast: None,
            should_quit: false,
            busy: None,
            monitor,
            files: LoadOrderFiles::default(),
            preview: None,
            view_error: None,
            view_refreshed_at: None,
            operation_tx,
            operation_rx,
            persist_config: false,
        };
        app.status = app.ready_status();
        app.sync_monitor();
        app.refresh_view();
        app
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn can_fix(&self) -> bool {
        self.config.is_valid() && self.ref_exists && !self.is_busy()
    }

    pub fn can_create_reference(&self) -> bool {
        self.config.is_valid() && !self.is_busy()
    }

    pub fn can_access_app_data(&self) -> bool {
        !self.is_busy() && !self.config.app_data_path.as_os_str().is_empty()
    }

    pub fn can_access_game(&self) -> bool {
        !self.is_busy() && !self.config.game_path.as_os_str().is_empty()
    }

    pub fn reference_action_label(&self) -> &'static str {
        if self.ref_exists {
            "Update reference"
        } else {
            "Create reference"
        }
    }

    pub fn ready_status(&self) -> String {
        if self.config.is_valid() {
            "Ready. Configuration is valid.".to_string()
        } else {
            "Configuration is required. Press s to set paths.".to_string()
        }
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }

        self.poll_operation();

        let now = Instant::now();
        let busy = self.is_busy();
        if self.monitor.begin(now, busy) {
            let result = keeper::check_drift(&self.config);
            if let Some(event) = self.monitor.finish(result) {
                self.handle_monitor_event(event);
            }
            self.refresh_view();
        } else if !busy && self.view_refresh_due(now) {
            self.refresh_view();
        }
    }

    fn view_refresh_due(&self, now: Instant) -> bool {
        match self.view_refreshed_at {
            Some(at) => now.saturating_duration_since(at) >= self.monitor.interval(),
            None => true,
        }
    }

    fn handle_monitor_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Drifted { first_difference } => {
                self.status = "Plugins.txt was modified outside Load Order Keeper.".to_string();
                let detail = first_difference
                    .map(|line| format!(" (first difference at line {line})"))
                    .unwrap_or_default();
                self.log_warn(format!("Plugins.txt changed externally{detail}"));
                self.show_toast("Plugins.txt changed externally", ToastLevel::Warn);
            }
            MonitorEvent::BackInSync => {
                self.status = self.ready_status();
                self.log_info("Plugins.txt matches the reference again".to_string());
            }
            MonitorEvent::Failed(message) => {
                self.status = format!("ERROR: Failed to monitor Plugins.txt: {message}");
                self.log_error(format!("Failed to monitor Plugins.txt: {message}"));
            }
        }
    }

    pub fn check_now(&mut self) {
        if !self.monitor.is_enabled() {
            self.status = if self.config.is_valid() {
                "Create a reference before checking for changes.".to_string()
            } else {
                self.ready_status()
            };
            return;
        }
        self.monitor.request_check();
        self.tick();
        if !self.monitor.changed_externally() {
            self.status = "Plugins.txt matches the reference.".to_string();
        }
    }

    /// Re-reads both files for the panels and recomputes the fix preview.
    pub fn refresh_view(&mut self) {
        self.view_refreshed_at = Some(Instant::now());
        if !self.config.app_data_path.is_dir() {
            self.files = LoadOrderFiles::default();
            self.preview = None;
            self.view_error = None;
            return;
        }

        match LoadOrderFiles::read(&self.config) {
            Ok(files) => {
                self.preview = match (&files.live, &files.reference) {
                    (Some(_), Some(_)) if self.config.is_valid() => {
                        let case_map = CaseMap::scan(&self.config.game_path);
                        Some(reconcile::reconcile_with_report(
                            &files.reference_entries(),
                            &files.live_entries(),
                            &case_map,
                        ))
                    }
                    _ => None,
                };
                self.files = files;
                self.view_error = None;
            }
            Err(err) => {
                self.view_error = Some(err.to_string());
            }
        }
    }

    fn sync_monitor(&mut self) {
        self.monitor.set_interval(self.config.monitor_interval());
        self.monitor
            .set_enabled(self.config.is_valid() && self.ref_exists);
    }

    pub fn start_fix(&mut self) {
        if !self.can_fix() {
            self.status = if self.is_busy() {
                "Busy; wait for the current operation to finish.".to_string()
            } else if !self.config.is_valid() {
                self.ready_status()
            } else {
                "No reference yet. Press r to create one.".to_string()
            };
            return;
        }
        let config = self.config.clone();
        self.spawn_operation(Operation::FixLoadOrder, move |tx| {
            let _ = tx.send(OperationMessage::Fixed(keeper::apply_load_order(&config)));
        });
    }

    pub fn request_create_reference(&mut self) {
        if !self.can_create_reference() {
            self.status = if self.is_busy() {
                "Busy; wait for the current operation to finish.".to_string()
            } else {
                self.ready_status()
            };
            return;
        }
        if self.ref_exists {
            self.dialog = Some(Dialog {
                title: "Update reference".to_string(),
                message: format!(
                    "Overwrite {} with the current Plugins.txt?",
                    config::REFERENCE_FILE_NAME
                ),
                kind: DialogKind::OverwriteReference,
                choice: DialogChoice::No,
            });
            return;
        }
        self.start_create_reference();
    }

    fn start_create_reference(&mut self) {
        let config = self.config.clone();
        self.spawn_operation(Operation::CreateReference, move |tx| {
            let _ = tx.send(OperationMessage::ReferenceCreated(
                snapshot::create_reference(&config),
            ));
        });
    }

    fn spawn_operation<F>(&mut self, operation: Operation, work: F)
    where
        F: FnOnce(Sender<OperationMessage>) + Send + 'static,
    {
        self.busy = Some(operation);
        self.status = operation.label().to_string();
        let tx = self.operation_tx.clone();
        thread::spawn(move || work(tx));
    }

    pub fn poll_operation(&mut self) {
        let message = match self.operation_rx.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                self.busy = None;
                return;
            }
        };

        self.busy = None;
        match message {
            OperationMessage::Fixed(Ok(outcome)) => {
                let report = &outcome.report;
                self.status = "Load order successfully applied and fixed!".to_string();
                self.log_info(format!(
                    "Applied load order: {} kept, {} added, {} removed, {} recased",
                    report.retained, report.added, report.pruned, report.recased
                ));
                if report.skipped_blank > 0 {
                    self.log_warn(format!(
                        "Dropped {} enable marker(s) without a plugin name",
                        report.skipped_blank
                    ));
                }
                self.show_toast("Load order fixed", ToastLevel::Info);
            }
            OperationMessage::Fixed(Err(err)) => {
                self.status = format!("ERROR: {err}");
                self.log_error(format!("Failed to fix load order: {err}"));
                self.show_toast("Fix failed", ToastLevel::Error);
            }
            OperationMessage::ReferenceCreated(Ok(bytes)) => {
                self.status =
                    "Reference created successfully! You can now fix the load order.".to_string();
                self.log_info(format!("Reference snapshot written ({bytes} bytes)"));
                self.show_toast("Reference saved", ToastLevel::Info);
            }
            OperationMessage::ReferenceCreated(Err(err)) => {
                self.status = format!("ERROR: {err}");
                self.log_error(format!("Failed to create reference: {err}"));
                self.show_toast("Reference failed", ToastLevel::Error);
            }
        }

        self.ref_exists = snapshot::reference_exists(&self.config);
        self.sync_monitor();
        self.monitor.request_check();
        self.refresh_view();
    }

    pub fn dialog_choice_left(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::Yes;
        }
    }

    pub fn dialog_choice_right(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = DialogChoice::No;
        }
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
    }

    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match (dialog.kind, dialog.choice) {
            (DialogKind::OverwriteReference, DialogChoice::Yes) => {
                if self.can_create_reference() {
                    self.start_create_reference();
                }
            }
            (DialogKind::OverwriteReference, DialogChoice::No) => {
                self.status = "Reference left unchanged.".to_string();
            }
        }
    }

    pub fn enter_settings(&mut self) {
        if self.is_busy() {
            self.status = "Busy; settings are locked.".to_string();
            return;
        }
        self.input_mode = InputMode::Editing {
            prompt: "AppData folder".to_string(),
            buffer: self.config.app_data_path.display().to_string(),
            purpose: InputPurpose::AppDataPath,
        };
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) -> Result<()> {
        let value = value.trim().to_string();
        match purpose {
            InputPurpose::AppDataPath => {
                self.input_mode = InputMode::Editing {
                    prompt: "Game folder".to_string(),
                    buffer: self.config.game_path.display().to_string(),
                    purpose: InputPurpose::GamePath { app_data: value },
                };
            }
            InputPurpose::GamePath { app_data } => {
                let buffer = self
                    .config
                    .plugin_check_interval_seconds
                    .map(|secs| secs.to_string())
                    .unwrap_or_default();
                self.input_mode = InputMode::Editing {
                    prompt: "Check interval seconds (blank = 5)".to_string(),
                    buffer,
                    purpose: InputPurpose::CheckInterval {
                        app_data,
                        game: value,
                    },
                };
            }
            InputPurpose::CheckInterval { app_data, game } => {
                let interval = if value.is_empty() {
                    None
                } else {
                    match value.parse::<i64>() {
                        Ok(secs) => Some(secs),
                        Err(_) => {
                            self.status = format!("Not a number: {value}");
                            self.input_mode = InputMode::Editing {
                                prompt: "Check interval seconds (blank = 5)".to_string(),
                                buffer: value,
                                purpose: InputPurpose::CheckInterval { app_data, game },
                            };
                            return Ok(());
                        }
                    }
                };
                let mut config = AppConfig {
                    app_data_path: PathBuf::from(app_data),
                    game_path: PathBuf::from(game),
                    plugin_check_interval_seconds: interval,
                };
                // Blank paths fall back to auto-detection.
                config.fill_detected_paths();
                self.apply_config(config)?;
            }
        }
        Ok(())
    }

    pub fn apply_config(&mut self, config: AppConfig) -> Result<()> {
        self.config = config;
        if self.persist_config {
            self.config.save()?;
        }
        self.ref_exists = snapshot::reference_exists(&self.config);
        self.status = if self.config.is_valid() {
            "Configuration updated.".to_string()
        } else {
            "Configuration is invalid.".to_string()
        };
        match self.config.validate() {
            Ok(()) => self.log_info("Settings saved".to_string()),
            Err(err) => self.log_warn(format!("Settings saved but {err}")),
        }
        self.sync_monitor();
        self.monitor.request_check();
        self.refresh_view();
        Ok(())
    }

    pub fn open_plugins_file(&mut self) {
        if !self.can_access_app_data() {
            return;
        }
        let path = self.config.plugins_file_path();
        if !path.is_file() {
            self.show_error(format!("Plugins file not found: {}", path.display()));
            return;
        }
        self.open_external(&path, "Plugins.txt");
    }

    pub fn open_reference_file(&mut self) {
        if !self.can_access_app_data() {
            return;
        }
        let path = self.config.reference_file_path();
        if !path.is_file() {
            self.show_error(format!("Reference file not found: {}", path.display()));
            return;
        }
        self.open_external(&path, "reference file");
    }

    pub fn open_app_data_folder(&mut self) {
        if !self.can_access_app_data() {
            return;
        }
        let path = self.config.app_data_path.clone();
        if !path.is_dir() {
            self.show_error("AppData folder is not configured or does not exist.".to_string());
            return;
        }
        self.open_external(&path, "AppData folder");
    }

    pub fn open_game_folder(&mut self) {
        if !self.can_access_game() {
            return;
        }
        let path = self.config.game_path.clone();
        if !path.is_dir() {
            self.show_error("Game folder is not configured or does not exist.".to_string());
            return;
        }
        self.open_external(&path, "game folder");
    }

    fn open_external(&mut self, target: &Path, label: &str) {
        match open_path(target) {
            Ok(()) => self.status = format!("Opened {label}"),
            Err(err) => self.show_error(format!("Failed to open {label}: {err}")),
        }
    }

    fn show_error(&mut self, message: String) {
        self.status = format!("ERROR: {message}");
        self.log_error(message.clone());
        self.show_toast(&message, ToastLevel::Error);
    }

    pub fn show_toast(&mut self, message: &str, level: ToastLevel) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + Duration::from_secs(TOAST_SECS),
        });
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Plugins => Focus::Reference,
            Focus::Reference => Focus::Preview,
            Focus::Preview => Focus::Plugins,
        };
    }

    fn focused_scroll(&mut self) -> &mut usize {
        match self.focus {
            Focus::Plugins => &mut self.plugins_scroll,
            Focus::Reference => &mut self.reference_scroll,
            Focus::Preview => &mut self.preview_scroll,
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let scroll = self.focused_scroll();
        *scroll = scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let scroll = self.focused_scroll();
        *scroll = scroll.saturating_add(lines);
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_add(lines);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn hint(&self) -> &'static str {
        if self.is_busy() {
            "Working..."
        } else if !self.config.is_valid() {
            "s settings | q quit"
        } else if !self.ref_exists {
            "r create reference | s settings | q quit"
        } else {
            "f fix | r reference | c check | p/e/a/g open | s settings | q quit"
        }
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }

        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }
        self.logs.push(LogEntry { level, message });
        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }
    }
}

/// Hands a file or folder to the desktop's default handler.
pub fn open_path(target: &Path) -> Result<()> {
    let target = target.to_string_lossy().to_string();
    let candidates: Vec<(&str, Vec<&str>)> = if cfg!(windows) {
        vec![("explorer", vec![target.as_str()])]
    } else if cfg!(target_os = "macos") {
        vec![("open", vec![target.as_str()])]
    } else {
        vec![
            ("xdg-open", vec![target.as_str()]),
            ("gio", vec!["open", target.as_str()]),
            ("kde-open5", vec![target.as_str()]),
        ]
    };

    let mut errors = Vec::new();
    for (command, args) in candidates {
        match Command::new(command)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => return Ok(()),
            Ok(status) => errors.push(format!("{command} exited {status}")),
            Err(err) => errors.push(format!("{command} failed: {err}")),
        }
    }
    anyhow::bail!("{}", errors.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout() -> (tempfile::TempDir, AppConfig) {
        let temp = tempfile::tempdir().unwrap();
        let app_data = temp.path().join("AppData");
        let game = temp.path().join("Game");
        fs::create_dir_all(&app_data).unwrap();
        fs::create_dir_all(game.join("Data")).unwrap();
        fs::write(game.join("Data").join("ModA.esp"), b"").unwrap();
        let config = AppConfig {
            app_data_path: app_data,
            game_path: game,
            plugin_check_interval_seconds: Some(1),
        };
        (temp, config)
    }

    fn wait_idle(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_busy() && Instant::now() < deadline {
            app.poll_operation();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!app.is_busy(), "operation did not finish");
    }

    #[test]
    fn commands_follow_configuration_state() {
        let app = App::with_config(AppConfig::default());
        assert!(!app.can_fix());
        assert!(!app.can_create_reference());
        assert!(!app.monitor.is_enabled());

        let (_temp, config) = layout();
        let app = App::with_config(config);
        assert!(app.can_create_reference());
        assert!(!app.can_fix());
        assert_eq!(app.reference_action_label(), "Create reference");
    }

    #[test]
    fn create_then_fix_round_trip() {
        let (_temp, config) = layout();
        fs::write(config.plugins_file_path(), "*moda.esp\n*New.esp\n").unwrap();
        let mut app = App::with_config(config.clone());

        app.request_create_reference();
        assert!(app.is_busy());
        assert!(!app.can_fix());
        wait_idle(&mut app);
        assert!(app.ref_exists);
        assert!(app.monitor.is_enabled());
        assert_eq!(app.reference_action_label(), "Update reference");

        app.start_fix();
        wait_idle(&mut app);
        assert_eq!(
            fs::read_to_string(config.plugins_file_path()).unwrap(),
            "*ModA.esp\r\n*New.esp\r\n"
        );
        assert!(app.status.starts_with("Load order successfully applied"));
    }

    #[test]
    fn existing_reference_asks_before_overwrite() {
        let (_temp, config) = layout();
        fs::write(config.plugins_file_path(), "*ModA.esp\n").unwrap();
        fs::write(config.reference_file_path(), "*Old.esp\n").unwrap();
        let mut app = App::with_config(config.clone());

        app.request_create_reference();
        assert!(app.dialog.is_some());
        assert!(!app.is_busy());
        app.dialog_confirm();
        assert_eq!(
            fs::read_to_string(config.reference_file_path()).unwrap(),
            "*Old.esp\n"
        );

        app.request_create_reference();
        app.dialog_set_choice(DialogChoice::Yes);
        app.dialog_confirm();
        wait_idle(&mut app);
        assert_eq!(
            fs::read_to_string(config.reference_file_path()).unwrap(),
            "*ModA.esp\n"
        );
    }

    #[test]
    fn external_change_raises_drift() {
        let (_temp, config) = layout();
        fs::write(config.plugins_file_path(), "*ModA.esp\n").unwrap();
        fs::write(config.reference_file_path(), "*ModA.esp\n").unwrap();
        let mut app = App::with_config(config.clone());
        app.tick();
        assert!(!app.monitor.changed_externally());

        fs::write(config.plugins_file_path(), "ModA.esp\n").unwrap();
        app.check_now();
        assert!(app.monitor.changed_externally());
        assert!(app.status.contains("modified outside"));
    }

    #[test]
    fn drift_checks_wait_while_busy() {
        let (_temp, config) = layout();
        fs::write(config.plugins_file_path(), "*ModA.esp\n").unwrap();
        fs::write(config.reference_file_path(), "*Other.esp\n").unwrap();
        let mut app = App::with_config(config);
        app.busy = Some(Operation::FixLoadOrder);
        app.monitor.request_check();
        app.tick();
        assert!(!app.monitor.changed_externally());
    }

    #[test]
    fn settings_flow_updates_config() {
        let (_temp, config) = layout();
        let mut app = App::with_config(AppConfig::default());
        app.enter_settings();
        app.handle_submit(
            InputPurpose::AppDataPath,
            config.app_data_path.display().to_string(),
        )
        .unwrap();
        let InputMode::Editing { purpose, .. } = app.input_mode.clone() else {
            panic!("expected game path prompt");
        };
        app.handle_submit(purpose, config.game_path.display().to_string())
            .unwrap();
        let InputMode::Editing { purpose, .. } = app.input_mode.clone() else {
            panic!("expected interval prompt");
        };
        app.handle_submit(purpose, "abc".to_string()).unwrap();
        assert!(app.status.starts_with("Not a number"));
        let InputMode::Editing { purpose, .. } = app.input_mode.clone() else {
            panic!("expected interval prompt again");
        };
        app.input_mode = InputMode::Normal;
        app.handle_submit(purpose, "7".to_string()).unwrap();

        assert!(app.config.is_valid());
        assert_eq!(app.config.monitor_interval(), Duration::from_secs(7));
        assert_eq!(app.status, "Configuration updated.");
    }

    #[test]
    fn log_is_bounded() {
        let mut app = App::with_config(AppConfig::default());
        for index in 0..(LOG_CAPACITY + 20) {
            app.log_info(format!("entry {index}"));
        }
        assert_eq!(app.logs.len(), LOG_CAPACITY);
        assert_eq!(app.logs[0].message, "entry 20");
    }

    #[test]
    fn blank_settings_paths_use_detection() {
        let (_temp, config) = layout();
        let mut app = App::with_config(AppConfig::default());
        app.handle_submit(
            InputPurpose::CheckInterval {
                app_data: "  ".to_string(),
                game: config.game_path.display().to_string(),
            },
            String::new(),
        )
        .unwrap();

        assert_eq!(app.config.game_path, config.game_path);
        assert_eq!(
            app.config.app_data_path,
            crate::starfield::find_app_data_dir().unwrap_or_default()
        );
        assert_eq!(app.config.plugin_check_interval_seconds, None);
    }
}
