use crate::{
    case_map::CaseMap,
    config::AppConfig,
    drift,
    error::{KeeperError, KeeperResult},
    files,
    plugins::{self, PluginEntry},
    reconcile::{self, ReconcileReport, ReconcileResult},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub report: ReconcileReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriftCheck {
    pub drifted: bool,
    pub first_difference: Option<usize>,
}

/// Raw contents of both files, as far as they could be read.
#[derive(Debug, Clone, Default)]
pub struct LoadOrderFiles {
    pub live: Option<Vec<String>>,
    pub reference: Option<Vec<String>>,
}

impl LoadOrderFiles {
    pub fn read(config: &AppConfig) -> KeeperResult<Self> {
        Ok(Self {
            live: files::read_lines(&config.plugins_file_path())?,
            reference: files::read_lines(&config.reference_file_path())?,
        })
    }

    pub fn live_entries(&self) -> Vec<PluginEntry> {
        entries_of(self.live.as_deref())
    }

    pub fn reference_entries(&self) -> Vec<PluginEntry> {
        entries_of(self.reference.as_deref())
    }
}

fn entries_of(lines: Option<&[String]>) -> Vec<PluginEntry> {
    lines
        .map(|lines| plugins::parse_lines(lines.iter().map(String::as_str)))
        .unwrap_or_default()
}

fn require_lines(
    path: &Path,
    missing: impl FnOnce(PathBuf) -> KeeperError,
) -> KeeperResult<Vec<String>> {
    files::read_lines(path)?.ok_or_else(|| missing(path.to_path_buf()))
}

/// Reads both files and computes the merged order without writing anything.
pub fn preview_load_order(config: &AppConfig) -> KeeperResult<ReconcileResult> {
    config.validate()?;

    let reference_lines = require_lines(&config.reference_file_path(), |path| {
        KeeperError::MissingReferenceFile { path }
    })?;
    let live_lines = require_lines(&config.plugins_file_path(), |path| {
        KeeperError::MissingLiveFile { path }
    })?;

    let case_map = CaseMap::scan(&config.game_path);
    if case_map.is_empty() {
        tracing::debug!("no plugins found under Data; names keep their listed casing");
    }
    let reference = plugins::parse_lines(reference_lines.iter().map(String::as_str));
    let current = plugins::parse_lines(live_lines.iter().map(String::as_str));
    Ok(reconcile::reconcile_with_report(&reference, &current, &case_map))
}

/// Rewrites `Plugins.txt` in reference order, keeping new plugins at the end.
pub fn apply_load_order(config: &AppConfig) -> KeeperResult<FixOutcome> {
    let result = preview_load_order(config)?;
    let lines = reconcile::render_lines(&result.order);
    let path = config.plugins_file_path();
    files::write_atomic(&path, files::join_lines(&lines).as_bytes())?;

    let report = result.report;
    tracing::info!(
        retained = report.retained,
        added = report.added,
        pruned = report.pruned,
        recased = report.recased,
        path = %path.display(),
        "load order applied"
    );
    if report.skipped_blank > 0 {
        tracing::warn!(
            count = report.skipped_blank,
            "dropped enable markers with no plugin name"
        );
    }

    Ok(FixOutcome {
        path,
        lines,
        report,
    })
}

/// Compares the live file against the reference snapshot line by line.
pub fn check_drift(config: &AppConfig) -> KeeperResult<DriftCheck> {
    config.validate()?;

    let reference_lines = require_lines(&config.reference_file_path(), |path| {
        KeeperError::MissingReferenceFile { path }
    })?;
    let live_lines = require_lines(&config.plugins_file_path(), |path| {
        KeeperError::MissingLiveFile { path }
    })?;

    if !drift::has_drifted(&reference_lines, &live_lines) {
        return Ok(DriftCheck {
            drifted: false,
            first_difference: None,
        });
    }
    let first_difference = drift::first_difference(&reference_lines, &live_lines);
    tracing::debug!(line = ?first_difference, "plugins file differs from reference");
    Ok(DriftCheck {
        drifted: true,
        first_difference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn layout(plugins_on_disk: &[&str]) -> (tempfile::TempDir, AppConfig) {
        let temp = tempfile::tempdir().unwrap();
        let app_data = temp.path().join("AppData");
        let data = temp.path().join("Game").join("Data");
        fs::create_dir_all(&app_data).unwrap();
        fs::create_dir_all(&data).unwrap();
        for name in plugins_on_disk {
            fs::write(data.join(name), b"").unwrap();
        }
        let config = AppConfig {
            app_data_path: app_data,
            game_path: temp.path().join("Game"),
            plugin_check_interval_seconds: None,
        };
        (temp, config)
    }

    #[test]
    fn fix_merges_and_writes() {
        let (_temp, config) = layout(&["ModA.esp", "ModB.esp", "ModC.esp"]);
        fs::write(config.reference_file_path(), "*ModA.esp\nModB.esp\n").unwrap();
        fs::write(config.plugins_file_path(), "*ModB.esp\n*modc.esp\n").unwrap();

        let outcome = apply_load_order(&config).unwrap();
        assert_eq!(outcome.lines, vec!["*ModB.esp", "*ModC.esp"]);
        assert_eq!(outcome.report.pruned, 1);
        assert_eq!(
            fs::read_to_string(config.plugins_file_path()).unwrap(),
            "*ModB.esp\r\n*ModC.esp\r\n"
        );
    }

    #[test]
    fn fix_is_idempotent() {
        let (_temp, config) = layout(&["ModA.esp"]);
        fs::write(config.reference_file_path(), "# keep\n*ModA.esp\n*Gone.esp\n").unwrap();
        fs::write(config.plugins_file_path(), "*New.esp\nmoda.esp\n").unwrap();

        let first = apply_load_order(&config).unwrap();
        let written = fs::read(config.plugins_file_path()).unwrap();
        let second = apply_load_order(&config).unwrap();
        assert_eq!(first.lines, second.lines);
        assert_eq!(fs::read(config.plugins_file_path()).unwrap(), written);
    }

    #[test]
    fn fix_reports_each_missing_file() {
        let (_temp, config) = layout(&[]);
        let err = apply_load_order(&config).unwrap_err();
        assert!(matches!(err, KeeperError::MissingReferenceFile { .. }));

        fs::write(config.reference_file_path(), "*A.esp\n").unwrap();
        let err = apply_load_order(&config).unwrap_err();
        assert!(matches!(err, KeeperError::MissingLiveFile { .. }));
    }

    #[test]
    fn fix_rejects_invalid_configuration() {
        let (_temp, mut config) = layout(&[]);
        config.game_path = config.game_path.join("missing");
        let err = apply_load_order(&config).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidConfiguration { .. }));
    }

    #[test]
    fn preview_leaves_file_untouched() {
        let (_temp, config) = layout(&[]);
        fs::write(config.reference_file_path(), "*B.esp\n*A.esp\n").unwrap();
        fs::write(config.plugins_file_path(), "A.esp\nB.esp\n").unwrap();
        let result = preview_load_order(&config).unwrap();
        assert_eq!(
            reconcile::render_lines(&result.order),
            vec!["*B.esp", "*A.esp"]
        );
        assert_eq!(
            fs::read_to_string(config.plugins_file_path()).unwrap(),
            "A.esp\nB.esp\n"
        );
    }

    #[test]
    fn drift_after_reference_is_clean() {
        let (_temp, config) = layout(&[]);
        fs::write(config.plugins_file_path(), "*A.esp\n*B.esp\n").unwrap();
        snapshot::create_reference(&config).unwrap();
        assert!(!check_drift(&config).unwrap().drifted);

        fs::write(config.plugins_file_path(), "*A.esp\n*B.esp\n\n\n").unwrap();
        assert!(!check_drift(&config).unwrap().drifted);

        fs::write(config.plugins_file_path(), "*A.esp\nB.esp\n").unwrap();
        let check = check_drift(&config).unwrap();
        assert!(check.drifted);
        assert_eq!(check.first_difference, Some(2));
    }

    #[test]
    fn drift_needs_both_files() {
        let (_temp, config) = layout(&[]);
        fs::write(config.plugins_file_path(), "*A.esp\n").unwrap();
        let err = check_drift(&config).unwrap_err();
        assert!(matches!(err, KeeperError::MissingReferenceFile { .. }));
    }

    #[test]
    fn reads_whatever_exists() {
        let (_temp, config) = layout(&[]);
        fs::write(config.plugins_file_path(), "# c\n*A.esp\nB.esp\n").unwrap();
        let files = LoadOrderFiles::read(&config).unwrap();
        assert!(files.reference.is_none());
        assert_eq!(files.live_entries().len(), 2);
        assert!(files.reference_entries().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn fix_writes_through_symlinked_plugins_file() {
        let (temp, config) = layout(&[]);
        let prefix = temp.path().join("prefix");
        fs::create_dir_all(&prefix).unwrap();
        let real = prefix.join("Plugins.txt");
        fs::write(&real, "*B.esp\n*A.esp\n").unwrap();
        std::os::unix::fs::symlink(&real, config.plugins_file_path()).unwrap();
        fs::write(config.reference_file_path(), "*A.esp\n*B.esp\n").unwrap();

        apply_load_order(&config).unwrap();
        let link_meta = fs::symlink_metadata(config.plugins_file_path()).unwrap();
        assert!(link_meta.file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "*A.esp\r\n*B.esp\r\n");
    }
}
