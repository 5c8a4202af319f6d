use crate::{
    config::AppConfig,
    error::{KeeperError, KeeperResult},
    files,
};
use std::{fs, io, time::SystemTime};

pub fn reference_exists(config: &AppConfig) -> bool {
    config.reference_file_path().is_file()
}

pub fn reference_modified(config: &AppConfig) -> Option<SystemTime> {
    fs::metadata(config.reference_file_path())
        .and_then(|meta| meta.modified())
        .ok()
}

/// Copies the live `Plugins.txt` over the reference byte for byte, so comments
/// and hand formatting survive into the baseline. Returns the bytes copied.
pub fn create_reference(config: &AppConfig) -> KeeperResult<usize> {
    config.validate()?;

    let live_path = config.plugins_file_path();
    let reference_path = config.reference_file_path();
    let contents = match fs::read(&live_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(KeeperError::MissingLiveFile { path: live_path });
        }
        Err(err) => return Err(KeeperError::io("read", &live_path, err)),
    };

    files::write_atomic(&reference_path, &contents)?;
    tracing::info!(
        bytes = contents.len(),
        path = %reference_path.display(),
        "reference snapshot written"
    );
    Ok(contents.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (tempfile::TempDir, AppConfig) {
        let temp = tempfile::tempdir().unwrap();
        let app_data = temp.path().join("AppData");
        let game = temp.path().join("Game");
        fs::create_dir_all(&app_data).unwrap();
        fs::create_dir_all(game.join("Data")).unwrap();
        let config = AppConfig {
            app_data_path: app_data,
            game_path: game,
            plugin_check_interval_seconds: None,
        };
        (temp, config)
    }

    #[test]
    fn copies_bytes_verbatim() {
        let (_temp, config) = layout();
        let raw = "# my notes\r\n*ModA.esp\n\nModB.esp   \n";
        fs::write(config.plugins_file_path(), raw).unwrap();

        assert!(!reference_exists(&config));
        let copied = create_reference(&config).unwrap();
        assert_eq!(copied, raw.len());
        assert!(reference_exists(&config));
        assert_eq!(fs::read_to_string(config.reference_file_path()).unwrap(), raw);
        assert!(reference_modified(&config).is_some());
    }

    #[test]
    fn overwrites_existing_reference() {
        let (_temp, config) = layout();
        fs::write(config.reference_file_path(), "*Old.esp\n").unwrap();
        fs::write(config.plugins_file_path(), "*New.esp\n").unwrap();
        create_reference(&config).unwrap();
        assert_eq!(
            fs::read_to_string(config.reference_file_path()).unwrap(),
            "*New.esp\n"
        );
    }

    #[test]
    fn missing_live_file_is_reported() {
        let (_temp, config) = layout();
        let err = create_reference(&config).unwrap_err();
        assert!(matches!(err, KeeperError::MissingLiveFile { .. }));
        assert!(!reference_exists(&config));
    }

    #[test]
    fn invalid_configuration_is_checked_first() {
        let err = create_reference(&AppConfig::default()).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidConfiguration { .. }));
    }
}
