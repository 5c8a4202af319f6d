use std::{
    fmt,
    hash::{Hash, Hasher},
};

pub const ENABLED_MARKER: char = '*';
const COMMENT_MARKER: char = '#';

/// One line of a load-order file.
///
/// Two entries are the same plugin when their names match ignoring case; the
/// enabled flag is not part of identity.
#[derive(Debug, Clone)]
pub struct PluginEntry {
    pub name: String,
    pub enabled: bool,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn to_line(&self) -> String {
        if self.enabled {
            format!("{ENABLED_MARKER}{}", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl PartialEq for PluginEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for PluginEntry {}

impl Hash for PluginEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

pub fn is_ignored_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER)
}

/// Parses a single line. Blank and comment lines yield `None`; every other
/// line yields an entry, even a bare `*` (which has an empty name).
pub fn parse_line(line: &str) -> Option<PluginEntry> {
    if is_ignored_line(line) {
        return None;
    }
    let trimmed = line.trim();
    let (enabled, rest) = match trimmed.strip_prefix(ENABLED_MARKER) {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    Some(PluginEntry::new(rest.trim(), enabled))
}

pub fn parse_lines<'a, I>(lines: I) -> Vec<PluginEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter_map(parse_line).collect()
}
