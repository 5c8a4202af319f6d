use crate::{case_map::CaseMap, plugins::PluginEntry};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Reference entries still present in the live file.
    pub retained: usize,
    /// Live entries unknown to the reference, appended at the end.
    pub added: usize,
    /// Reference entries no longer present in the live file.
    pub pruned: usize,
    /// Emitted entries whose casing was corrected from the Data directory.
    pub recased: usize,
    /// Bare `*` lines with no filename.
    pub skipped_blank: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileResult {
    pub order: Vec<PluginEntry>,
    pub report: ReconcileReport,
}

pub fn reconcile(
    reference: &[PluginEntry],
    current: &[PluginEntry],
    case_map: &CaseMap,
) -> Vec<PluginEntry> {
    reconcile_with_report(reference, current, case_map).order
}

/// Merges the reference order with the live file.
///
/// Reference entries keep their relative order when they are still installed;
/// entries only present in the live file follow in their own order. Every
/// emitted entry is enabled and carries its on-disk casing when known.
pub fn reconcile_with_report(
    reference: &[PluginEntry],
    current: &[PluginEntry],
    case_map: &CaseMap,
) -> ReconcileResult {
    let current_keys: HashSet<String> = current.iter().map(PluginEntry::key).collect();
    let reference_keys: HashSet<String> = reference.iter().map(PluginEntry::key).collect();

    let mut report = ReconcileReport::default();
    let mut order = Vec::with_capacity(current.len());

    for entry in reference {
        if entry.name.is_empty() {
            report.skipped_blank += 1;
            continue;
        }
        if current_keys.contains(&entry.key()) {
            report.retained += 1;
            order.push(emit(entry, case_map, &mut report));
        } else {
            report.pruned += 1;
        }
    }

    for entry in current {
        if entry.name.is_empty() {
            report.skipped_blank += 1;
            continue;
        }
        if !reference_keys.contains(&entry.key()) {
            report.added += 1;
            order.push(emit(entry, case_map, &mut report));
        }
    }

    ReconcileResult { order, report }
}

fn emit(entry: &PluginEntry, case_map: &CaseMap, report: &mut ReconcileReport) -> PluginEntry {
    let resolved = case_map.resolve(&entry.name);
    if resolved != entry.name {
        report.recased += 1;
    }
    PluginEntry::new(resolved, true)
}

pub fn render_lines(entries: &[PluginEntry]) -> Vec<String> {
    entries.iter().map(PluginEntry::to_line).collect()
}
