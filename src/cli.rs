use crate::{
    app::{self, App},
    config::{self, AppConfig},
    error::KeeperError,
    keeper::{self, DriftCheck},
    logging::{self, Verbosity},
    monitor::{DriftMonitor, MonitorEvent},
    reconcile::{self, ReconcileReport},
    snapshot,
    starfield::{self, GamePaths},
    ui,
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant, SystemTime},
};

const WATCH_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

struct GlobalOptions {
    format: OutputFormat,
    verbosity: Verbosity,
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui,
    Command {
        command: CliCommand,
        format: OutputFormat,
        verbosity: Verbosity,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Status,
    Fix,
    Reference,
    Check,
    Watch,
    Preview,
    Paths,
    Config(ConfigUpdate),
    Open(OpenTarget),
    Help,
    Version,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ConfigUpdate {
    app_data: Option<PathBuf>,
    game: Option<PathBuf>,
    interval: Option<i64>,
    detect: bool,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.app_data.is_none() && self.game.is_none() && self.interval.is_none() && !self.detect
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenTarget {
    Plugins,
    Reference,
    AppData,
    Game,
}

impl OpenTarget {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "plugins" => Ok(OpenTarget::Plugins),
            "reference" => Ok(OpenTarget::Reference),
            "appdata" => Ok(OpenTarget::AppData),
            "game" => Ok(OpenTarget::Game),
            _ => bail!("Unknown open target: {value} (use plugins, reference, appdata or game)"),
        }
    }
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Ui => {
            logging::init_file(&config::base_data_dir()?)?;
            let mut app = App::initialize()?;
            ui::run(&mut app)
        }
        CliAction::Command {
            command,
            format,
            verbosity,
        } => match command {
            CliCommand::Help => {
                print_help();
                Ok(())
            }
            CliCommand::Version => {
                println!("Load Order Keeper v{}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            command => {
                logging::init_cli(verbosity);
                let mut config = AppConfig::load_or_create()?;
                run_command(&mut config, command, format)
            }
        },
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    if args.is_empty() {
        return Ok(CliAction::Ui);
    }

    let (global, tokens) = parse_global_options(args)?;
    let command = |command| CliAction::Command {
        command,
        format: global.format,
        verbosity: global.verbosity,
    };

    let Some(head) = tokens.first() else {
        return Ok(CliAction::Ui);
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let parsed = match head.as_str() {
        "--help" | "-h" | "help" => CliCommand::Help,
        "--version" | "-V" | "version" => CliCommand::Version,
        "status" => CliCommand::Status,
        "fix" => CliCommand::Fix,
        "reference" => CliCommand::Reference,
        "check" => CliCommand::Check,
        "watch" => CliCommand::Watch,
        "preview" => CliCommand::Preview,
        "paths" => CliCommand::Paths,
        "config" => CliCommand::Config(parse_config_update(rest)?),
        "open" => {
            let target = rest
                .first()
                .ok_or_else(|| anyhow::anyhow!("open requires a target"))?;
            CliCommand::Open(OpenTarget::parse(target)?)
        }
        other => bail!("Unknown command: {other} (see --help)"),
    };
    Ok(command(parsed))
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut format = OutputFormat::Text;
    let mut verbosity = Verbosity::Normal;
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            format = parse_format(value)?;
            continue;
        }
        match arg.as_str() {
            "--format" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--format requires a value"))?;
                format = parse_format(value)?;
            }
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            "--verbose" => verbosity = Verbosity::Verbose,
            _ if arg.starts_with("-v") && arg.chars().skip(1).all(|ch| ch == 'v') => {
                let count = arg.chars().filter(|ch| *ch == 'v').count();
                verbosity = if count >= 2 {
                    Verbosity::Debug
                } else {
                    Verbosity::Verbose
                };
            }
            _ => tokens.push(arg.to_string()),
        }
    }

    Ok((GlobalOptions { format, verbosity }, tokens))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value).ok_or_else(|| anyhow::anyhow!("Unknown format: {value}"))
}

fn parse_config_update(args: &[String]) -> Result<ConfigUpdate> {
    let mut update = ConfigUpdate::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
        };
        match flag {
            "--appdata" => update.app_data = Some(PathBuf::from(value()?)),
            "--game" => update.game = Some(PathBuf::from(value()?)),
            "--interval" => {
                let raw = value()?;
                let secs = raw
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("--interval expects whole seconds, got {raw}"))?;
                update.interval = Some(secs);
            }
            "--detect" => update.detect = true,
            _ => bail!("Unknown config option: {arg}"),
        }
    }
    Ok(update)
}

fn run_command(config: &mut AppConfig, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Status => show_status(config, format),
        CliCommand::Fix => fix(config, format),
        CliCommand::Reference => create_reference(config, format),
        CliCommand::Check => check(config, format),
        CliCommand::Watch => watch(config, format),
        CliCommand::Preview => preview(config, format),
        CliCommand::Paths => list_paths(config, format),
        CliCommand::Config(update) => update_config(config, update, format),
        CliCommand::Open(target) => open_target(config, target),
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct StatusOutput {
    config_valid: bool,
    config_error: Option<String>,
    app_data_path: String,
    game_path: String,
    check_interval_secs: u64,
    plugins_file_exists: bool,
    reference_exists: bool,
    reference_modified: Option<String>,
    drift: Option<DriftCheck>,
    drift_error: Option<String>,
    drift_error_kind: Option<&'static str>,
}

fn show_status(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let config_error = config.validate().err().map(|err| err.to_string());
    let reference_exists = snapshot::reference_exists(config);
    let (drift, drift_failure) = if config_error.is_none() && reference_exists {
        match keeper::check_drift(config) {
            Ok(check) => (Some(check), None),
            Err(err) => (None, Some(err)),
        }
    } else {
        (None, None)
    };

    let output = StatusOutput {
        config_valid: config_error.is_none(),
        config_error,
        app_data_path: config.app_data_path.display().to_string(),
        game_path: config.game_path.display().to_string(),
        check_interval_secs: config.monitor_interval().as_secs(),
        plugins_file_exists: config.plugins_file_path().is_file(),
        reference_exists,
        reference_modified: snapshot::reference_modified(config).and_then(format_modified),
        drift,
        drift_error: drift_failure.as_ref().map(|err| err.to_string()),
        drift_error_kind: drift_failure.as_ref().map(|err| err.kind()),
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            match &output.config_error {
                None => println!("Configuration: valid"),
                Some(err) => println!("Configuration: invalid ({err})"),
            }
            println!("AppData: {}", output.app_data_path);
            println!("Game: {}", output.game_path);
            println!("Check interval: {}s", output.check_interval_secs);
            println!(
                "Plugins.txt: {}",
                if output.plugins_file_exists { "present" } else { "missing" }
            );
            match (&output.reference_modified, output.reference_exists) {
                (Some(modified), true) => println!("Reference: present (updated {modified})"),
                (None, true) => println!("Reference: present"),
                _ => println!("Reference: missing"),
            }
            if let Some(check) = output.drift {
                println!("Drift: {}", describe_drift(&check));
            }
            if let Some(err) = output.drift_error {
                println!("Drift: unknown ({err})");
            }
        }
    }
    Ok(())
}

fn format_modified(modified: SystemTime) -> Option<String> {
    let format =
        time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    time::OffsetDateTime::from(modified).format(&format).ok()
}

fn describe_drift(check: &DriftCheck) -> String {
    match (check.drifted, check.first_difference) {
        (false, _) => "in sync with reference".to_string(),
        (true, Some(line)) => format!("changed externally (first difference at line {line})"),
        (true, None) => "changed externally".to_string(),
    }
}

fn summarize(report: &ReconcileReport) -> String {
    format!(
        "{} kept, {} added, {} removed, {} recased",
        report.retained, report.added, report.pruned, report.recased
    )
}

fn fix(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let outcome = keeper::apply_load_order(config)?;
    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => {
            println!(
                "Wrote {} entries to {}",
                outcome.lines.len(),
                outcome.path.display()
            );
            println!("{}", summarize(&outcome.report));
            if outcome.report.skipped_blank > 0 {
                println!(
                    "Dropped {} enable marker(s) without a plugin name",
                    outcome.report.skipped_blank
                );
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ReferenceOutput {
    path: String,
    bytes: usize,
}

fn create_reference(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let bytes = snapshot::create_reference(config)?;
    let output = ReferenceOutput {
        path: config.reference_file_path().display().to_string(),
        bytes,
    };
    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => println!("Reference written to {} ({} bytes)", output.path, bytes),
    }
    Ok(())
}

fn check(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let check = keeper::check_drift(config)?;
    match format {
        OutputFormat::Json => print_json(&check)?,
        OutputFormat::Text => println!("Plugins.txt is {}", describe_drift(&check)),
    }
    if check.drifted {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Serialize)]
struct WatchEvent {
    event: &'static str,
    first_difference: Option<usize>,
    error: Option<String>,
}

impl From<MonitorEvent> for WatchEvent {
    fn from(event: MonitorEvent) -> Self {
        match event {
            MonitorEvent::Drifted { first_difference } => WatchEvent {
                event: "drifted",
                first_difference,
                error: None,
            },
            MonitorEvent::BackInSync => WatchEvent {
                event: "in_sync",
                first_difference: None,
                error: None,
            },
            MonitorEvent::Failed(message) => WatchEvent {
                event: "failed",
                first_difference: None,
                error: Some(message),
            },
        }
    }
}

fn watch(config: &AppConfig, format: OutputFormat) -> Result<()> {
    config.validate()?;
    if !snapshot::reference_exists(config) {
        return Err(KeeperError::MissingReferenceFile {
            path: config.reference_file_path(),
        }
        .into());
    }

    let mut monitor = DriftMonitor::new(config.monitor_interval());
    monitor.set_enabled(true);
    if format == OutputFormat::Text {
        println!(
            "Watching {} every {}s (Ctrl+C to stop)",
            config.plugins_file_path().display(),
            monitor.interval().as_secs()
        );
    }
    tracing::info!(interval = monitor.interval().as_secs(), "watching for drift");

    loop {
        let event = monitor.run_if_due(Instant::now(), false, || keeper::check_drift(config));
        if let Some(event) = event {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string(&WatchEvent::from(event))?)
                }
                OutputFormat::Text => match event {
                    MonitorEvent::Drifted { first_difference } => println!(
                        "Plugins.txt changed externally{}",
                        first_difference
                            .map(|line| format!(" (first difference at line {line})"))
                            .unwrap_or_default()
                    ),
                    MonitorEvent::BackInSync => println!("Plugins.txt matches the reference again"),
                    MonitorEvent::Failed(message) => println!("Check failed: {message}"),
                },
            }
        }
        thread::sleep(WATCH_POLL);
    }
}

#[derive(Serialize)]
struct PreviewOutput {
    lines: Vec<String>,
    report: ReconcileReport,
}

fn preview(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let result = keeper::preview_load_order(config)?;
    let output = PreviewOutput {
        lines: reconcile::render_lines(&result.order),
        report: result.report,
    };
    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            for line in &output.lines {
                println!("{line}");
            }
            tracing::info!("{}", summarize(&output.report));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsOutput {
    config_file: String,
    game_root: String,
    data_dir: String,
    app_data_dir: String,
    plugins_path: String,
    reference_path: String,
    error: Option<String>,
}

fn list_paths(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let detected = starfield::detect_paths(
        Some(config.game_path.as_path()),
        Some(config.app_data_path.as_path()),
    );
    let (paths, error) = match detected {
        Ok(paths) => (paths, None),
        Err(err) => (GamePaths::from_config(config), Some(format!("{err:#}"))),
    };

    let output = PathsOutput {
        config_file: config::config_path()?.display().to_string(),
        game_root: paths.game_root.display().to_string(),
        data_dir: paths.data_dir.display().to_string(),
        app_data_dir: paths.app_data_dir.display().to_string(),
        plugins_path: paths.plugins_path.display().to_string(),
        reference_path: paths.reference_path.display().to_string(),
        error,
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            println!("Settings: {}", output.config_file);
            println!("Game root: {}", output.game_root);
            println!("Data dir: {}", output.data_dir);
            println!("AppData: {}", output.app_data_dir);
            println!("Plugins.txt: {}", output.plugins_path);
            println!("Reference: {}", output.reference_path);
            if let Some(error) = output.error {
                println!("Warning: {error}");
            }
        }
    }
    Ok(())
}

fn apply_update(config: &mut AppConfig, update: ConfigUpdate) {
    if update.detect {
        if update.app_data.is_none() {
            config.app_data_path = PathBuf::new();
        }
        if update.game.is_none() {
            config.game_path = PathBuf::new();
        }
    }
    if let Some(path) = update.app_data {
        config.app_data_path = path;
    }
    if let Some(path) = update.game {
        config.game_path = path;
    }
    if let Some(secs) = update.interval {
        config.plugin_check_interval_seconds = Some(secs);
    }
    if update.detect {
        config.fill_detected_paths();
    }
}

#[derive(Serialize)]
struct ConfigOutput<'a> {
    config_file: String,
    valid: bool,
    #[serde(flatten)]
    config: &'a AppConfig,
}

fn update_config(config: &mut AppConfig, update: ConfigUpdate, format: OutputFormat) -> Result<()> {
    if !update.is_empty() {
        apply_update(config, update);
        config.save()?;
        tracing::info!("settings saved");
    }

    let output = ConfigOutput {
        config_file: config::config_path()?.display().to_string(),
        valid: config.is_valid(),
        config,
    };
    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            println!("Settings: {}", output.config_file);
            println!("AppData: {}", config.app_data_path.display());
            println!("Game: {}", config.game_path.display());
            match config.plugin_check_interval_seconds {
                Some(secs) => println!(
                    "Check interval: {secs}s (effective {}s)",
                    config.monitor_interval().as_secs()
                ),
                None => println!(
                    "Check interval: default ({}s)",
                    config::DEFAULT_CHECK_INTERVAL_SECS
                ),
            }
            if let Err(err) = config.validate() {
                println!("Warning: {err}");
            }
        }
    }
    Ok(())
}

fn open_target(config: &AppConfig, target: OpenTarget) -> Result<()> {
    let (path, label) = match target {
        OpenTarget::Plugins => (config.plugins_file_path(), "Plugins.txt"),
        OpenTarget::Reference => (config.reference_file_path(), "reference file"),
        OpenTarget::AppData => (config.app_data_path.clone(), "AppData folder"),
        OpenTarget::Game => (config.game_path.clone(), "game folder"),
    };
    if path.as_os_str().is_empty() || !path.exists() {
        bail!("{label} not found: {}", path.display());
    }
    app::open_path(&path).with_context(|| format!("open {label}"))
}

fn print_help() {
    println!("Load Order Keeper v{}", env!("CARGO_PKG_VERSION"));
    println!("Keeps Starfield's Plugins.txt in line with a saved reference order.");
    println!();
    println!("Usage:");
    println!("  loadorder-keeper                     Launch TUI");
    println!("  loadorder-keeper status              Show configuration, reference and drift state");
    println!("  loadorder-keeper fix                 Rewrite Plugins.txt in reference order");
    println!("  loadorder-keeper reference           Save Plugins.txt as the reference");
    println!("  loadorder-keeper check               Compare once; exit 1 when changed");
    println!("  loadorder-keeper watch               Report changes until interrupted");
    println!("  loadorder-keeper preview             Print the fixed order without writing");
    println!("  loadorder-keeper paths               Show configured and detected paths");
    println!("  loadorder-keeper config [options]    Show or update settings");
    println!("  loadorder-keeper open <target>       Open plugins | reference | appdata | game");
    println!();
    println!("Config options:");
    println!("  --appdata <path>                     Folder holding Plugins.txt");
    println!("  --game <path>                        Starfield install folder");
    println!("  --interval <secs>                    Drift check interval (0 = default)");
    println!("  --detect                             Re-detect paths not given explicitly");
    println!();
    println!("Global options:");
    println!("  --format <json|text>                 Output format");
    println!("  -q, --quiet                          Errors only");
    println!("  -v, -vv                              Increase log verbosity");
    println!("  -h, --help                           Show help");
    println!("  -V, --version                        Show version");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn command_of(values: &[&str]) -> (CliCommand, OutputFormat, Verbosity) {
        match parse_args(&args(values)).unwrap() {
            CliAction::Command {
                command,
                format,
                verbosity,
            } => (command, format, verbosity),
            CliAction::Ui => panic!("expected a command"),
        }
    }

    #[test]
    fn no_arguments_launch_ui() {
        assert_eq!(parse_args(&[]).unwrap(), CliAction::Ui);
    }

    #[test]
    fn global_options_apply_anywhere() {
        let (command, format, verbosity) = command_of(&["check", "--format", "json", "-vv"]);
        assert_eq!(command, CliCommand::Check);
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(verbosity, Verbosity::Debug);

        let (command, format, verbosity) = command_of(&["--format=text", "-v", "status"]);
        assert_eq!(command, CliCommand::Status);
        assert_eq!(format, OutputFormat::Text);
        assert_eq!(verbosity, Verbosity::Verbose);
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["status", "--format", "yaml"])).is_err());
        assert!(parse_args(&args(&["open", "desktop"])).is_err());
        assert!(parse_args(&args(&["open"])).is_err());
    }

    #[test]
    fn parses_config_options() {
        let (command, _, _) = command_of(&[
            "config",
            "--appdata",
            "/saves/Starfield",
            "--game=/games/Starfield",
            "--interval",
            "12",
        ]);
        assert_eq!(
            command,
            CliCommand::Config(ConfigUpdate {
                app_data: Some(PathBuf::from("/saves/Starfield")),
                game: Some(PathBuf::from("/games/Starfield")),
                interval: Some(12),
                detect: false,
            })
        );
        assert!(parse_args(&args(&["config", "--interval", "soon"])).is_err());
        assert!(parse_args(&args(&["config", "--game"])).is_err());
    }

    #[test]
    fn parses_open_targets() {
        let (command, _, _) = command_of(&["open", "reference"]);
        assert_eq!(command, CliCommand::Open(OpenTarget::Reference));
    }

    #[test]
    fn explicit_paths_survive_detect() {
        let mut config = AppConfig {
            app_data_path: PathBuf::from("/old/appdata"),
            game_path: PathBuf::from("/old/game"),
            plugin_check_interval_seconds: None,
        };
        apply_update(
            &mut config,
            ConfigUpdate {
                app_data: Some(PathBuf::from("/new/appdata")),
                interval: Some(-3),
                ..ConfigUpdate::default()
            },
        );
        assert_eq!(config.app_data_path, PathBuf::from("/new/appdata"));
        assert_eq!(config.game_path, PathBuf::from("/old/game"));
        assert_eq!(config.monitor_interval(), Duration::from_secs(5));
    }

    #[test]
    fn formats_reference_time_in_utc() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(
            format_modified(modified).as_deref(),
            Some("2023-11-14 22:13:20 UTC")
        );
    }

    #[test]
    fn drift_descriptions() {
        let drifted = DriftCheck {
            drifted: true,
            first_difference: Some(4),
        };
        assert!(describe_drift(&drifted).contains("line 4"));
        let clean = DriftCheck {
            drifted: false,
            first_difference: None,
        };
        assert_eq!(describe_drift(&clean), "in sync with reference");
    }

    #[test]
    fn watch_without_reference_is_a_typed_error() {
        let temp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            app_data_path: temp.path().join("AppData"),
            game_path: temp.path().join("Game"),
            plugin_check_interval_seconds: None,
        };
        std::fs::create_dir_all(&config.app_data_path).unwrap();
        std::fs::create_dir_all(config.game_path.join("Data")).unwrap();

        let err = watch(&config, OutputFormat::Json).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeeperError>(),
            Some(KeeperError::MissingReferenceFile { .. })
        ));
    }
}
