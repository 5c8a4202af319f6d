use crate::config::{AppConfig, PLUGINS_FILE_NAME, REFERENCE_FILE_NAME};
use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const GAME_NAME: &str = "Starfield";
const STEAM_APP_ID: &str = "1716740";

#[derive(Debug, Clone)]
pub struct GamePaths {
    pub game_root: PathBuf,
    pub data_dir: PathBuf,
    pub app_data_dir: PathBuf,
    pub plugins_path: PathBuf,
    pub reference_path: PathBuf,
}

impl GamePaths {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            game_root: config.game_path.clone(),
            data_dir: config.data_dir_path(),
            app_data_dir: config.app_data_path.clone(),
            plugins_path: config.plugins_file_path(),
            reference_path: config.reference_file_path(),
        }
    }
}

pub fn detect_paths(
    game_root_override: Option<&Path>,
    app_data_override: Option<&Path>,
) -> Result<GamePaths> {
    let game_root = match game_root_override.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => path.to_path_buf(),
        None => find_game_root().context("locate Starfield game directory")?,
    };

    let app_data_dir = match app_data_override.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => path.to_path_buf(),
        None => find_app_data_dir().context("locate Starfield AppData directory")?,
    };

    if !looks_like_game_root(&game_root) {
        bail!(
            "invalid game root: expected Data/ in {}",
            game_root.display()
        );
    }

    if !app_data_dir.is_dir() {
        bail!("invalid AppData dir: {} does not exist", app_data_dir.display());
    }

    Ok(GamePaths {
        data_dir: game_root.join("Data"),
        plugins_path: app_data_dir.join(PLUGINS_FILE_NAME),
        reference_path: app_data_dir.join(REFERENCE_FILE_NAME),
        game_root,
        app_data_dir,
    })
}

pub fn find_game_root() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(home) = dirs_home() {
        candidates.push(home.join(".local/share/Steam"));
        candidates.push(home.join(".steam/steam"));
        candidates.push(home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam"));
    }

    let mut libraries = Vec::new();
    for base in candidates {
        let vdf = base.join("steamapps/libraryfolders.vdf");
        if vdf.exists() {
            if let Ok(paths) = parse_steam_library_paths(&vdf) {
                libraries.extend(paths);
            }
        }
        libraries.push(base);
    }

    libraries
        .into_iter()
        .map(|lib| lib.join("steamapps/common").join(GAME_NAME))
        .find(|candidate| looks_like_game_root(candidate))
}

pub fn find_app_data_dir() -> Option<PathBuf> {
    if let Some(base) = BaseDirs::new() {
        let native = base.data_local_dir().join(GAME_NAME);
        if cfg!(windows) && native.is_dir() {
            return Some(native);
        }
    }

    let home = dirs_home()?;
    [
        home.join(".local/share/Steam"),
        home.join(".steam/steam"),
        home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam"),
    ]
    .into_iter()
    .map(|steam| {
        steam
            .join("steamapps/compatdata")
            .join(STEAM_APP_ID)
            .join("pfx/drive_c/users/steamuser/AppData/Local")
            .join(GAME_NAME)
    })
    .find(|candidate| candidate.is_dir())
}

fn parse_steam_library_paths(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = fs::read_to_string(path).context("read libraryfolders.vdf")?;
    Ok(library_paths_from_vdf(&raw))
}

fn library_paths_from_vdf(raw: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if !line.contains("\"path\"") {
            continue;
        }

        let parts: Vec<&str> = line.split('"').collect();
        if parts.len() >= 4 {
            let path = parts[3].replace("\\\\", "\\");
            paths.push(PathBuf::from(path));
        }
    }

    paths
}

fn dirs_home() -> Option<PathBuf> {
    BaseDirs::new()
        .map(|base| base.home_dir().to_path_buf())
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
}

pub fn looks_like_game_root(path: &Path) -> bool {
    path.join("Data").is_dir()
}
