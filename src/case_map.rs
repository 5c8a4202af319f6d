use std::{collections::HashMap, path::Path};
use walkdir::WalkDir;

pub const DATA_DIR_NAME: &str = "Data";
pub const PLUGIN_EXTENSIONS: [&str; 2] = ["esm", "esp"];

/// Lower-cased plugin filename to the exact name found on disk.
#[derive(Debug, Clone, Default)]
pub struct CaseMap {
    names: HashMap<String, String>,
}

impl CaseMap {
    /// Scans `<game_root>/Data` (top level only). A missing or unreadable
    /// directory yields an empty map so names pass through unchanged.
    pub fn scan(game_root: &Path) -> Self {
        let data_dir = game_root.join(DATA_DIR_NAME);
        if !data_dir.is_dir() {
            tracing::debug!(path = %data_dir.display(), "data directory missing; case map empty");
            return Self::default();
        }

        let mut map = Self::default();
        for entry in WalkDir::new(&data_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(path = %data_dir.display(), "case scan skipped entry: {err}");
                    continue;
                }
            };
            // Mod managers often link plugins into Data; a link to a file counts.
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if is_plugin_file(name) {
                map.insert(name);
            }
        }

        tracing::debug!(count = map.len(), path = %data_dir.display(), "built case map");
        map
    }

    pub fn insert(&mut self, on_disk: &str) {
        self.names.insert(on_disk.to_lowercase(), on_disk.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for CaseMap {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut map = Self::default();
        for name in iter {
            map.insert(name);
        }
        map
    }
}

fn is_plugin_file(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && PLUGIN_EXTENSIONS
            .iter()
            .any(|plugin_ext| ext.eq_ignore_ascii_case(plugin_ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_data_dir_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let map = CaseMap::scan(temp.path());
        assert!(map.is_empty());
    }

    #[test]
    fn scans_top_level_plugins_only() {
        let temp = tempfile::tempdir().unwrap();
        let data = temp.path().join("Data");
        fs::create_dir_all(data.join("Nested")).unwrap();
        fs::write(data.join("Starfield.esm"), b"").unwrap();
        fs::write(data.join("ModA.esp"), b"").unwrap();
        fs::write(data.join("Textures.ba2"), b"").unwrap();
        fs::write(data.join("Nested").join("Hidden.esp"), b"").unwrap();

        let map = CaseMap::scan(temp.path());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("starfield.esm"), Some("Starfield.esm"));
        assert_eq!(map.get("MODA.ESP"), Some("ModA.esp"));
        assert_eq!(map.get("hidden.esp"), None);
        assert_eq!(map.get("textures.ba2"), None);
    }

    #[test]
    fn unknown_names_pass_through() {
        let map: CaseMap = ["ModA.esp"].into_iter().collect();
        assert_eq!(map.resolve("moda.esp"), "ModA.esp");
        assert_eq!(map.resolve("Other.esp"), "Other.esp");
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(is_plugin_file("Upper.ESP"));
        assert!(is_plugin_file("Master.Esm"));
        assert!(!is_plugin_file("Light.esl"));
        assert!(!is_plugin_file(".esp"));
        assert!(!is_plugin_file("noext"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_plugins_are_listed() {
        let temp = tempfile::tempdir().unwrap();
        let store = temp.path().join("store");
        let data = temp.path().join("Data");
        fs::create_dir_all(&store).unwrap();
        fs::create_dir_all(data.join("Linked")).unwrap();
        fs::write(store.join("ModA.esp"), b"").unwrap();
        std::os::unix::fs::symlink(store.join("ModA.esp"), data.join("ModA.esp")).unwrap();
        std::os::unix::fs::symlink(data.join("Linked"), data.join("Folder.esp")).unwrap();

        let map = CaseMap::scan(temp.path());
        assert_eq!(map.get("moda.esp"), Some("ModA.esp"));
        assert_eq!(map.get("folder.esp"), None);
    }
}
