use crate::error::{KeeperError, KeeperResult};
use std::{ffi::OsString, fs, io, path::Path};

pub const LINE_ENDING: &str = "\r\n";
const UTF8_BOM: char = '\u{feff}';

/// Reads a whole text file. A missing file is `Ok(None)`.
pub fn read_text(path: &Path) -> KeeperResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(match raw.strip_prefix(UTF8_BOM) {
            Some(rest) => rest.to_string(),
            None => raw,
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            Err(KeeperError::InvalidEncoding {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(KeeperError::io("read", path, err)),
    }
}

pub fn read_lines(path: &Path) -> KeeperResult<Option<Vec<String>>> {
    Ok(read_text(path)?.map(|raw| raw.lines().map(str::to_string).collect()))
}

pub fn join_lines(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|line| line.len() + 2).sum());
    for line in lines {
        out.push_str(line);
        out.push_str(LINE_ENDING);
    }
    out
}

/// Replaces `path` by writing a sibling temp file and renaming it over the target.
///
/// A symlinked `path` is resolved first so the file it points at is replaced
/// and the link itself survives.
pub fn write_atomic(path: &Path, contents: &[u8]) -> KeeperResult<()> {
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(err) => return Err(KeeperError::io("resolve", path, err)),
    };
    let file_name = target
        .file_name()
        .ok_or_else(|| KeeperError::invalid(format!("not a file path: {}", path.display())))?;
    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp_path = target.with_file_name(temp_name);

    if let Err(err) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(KeeperError::io("write", &temp_path, err));
    }
    if let Err(err) = fs::rename(&temp_path, &target) {
        let _ = fs::remove_file(&temp_path);
        return Err(KeeperError::io("replace", &target, err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let temp = tempfile::tempdir().unwrap();
        assert!(read_text(&temp.path().join("absent.txt")).unwrap().is_none());
    }

    #[test]
    fn strips_bom_and_handles_crlf() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Plugins.txt");
        fs::write(&path, "\u{feff}*A.esm\r\n*B.esp\r\n").unwrap();
        let lines = read_lines(&path).unwrap().unwrap();
        assert_eq!(lines, vec!["*A.esm", "*B.esp"]);
    }

    #[test]
    fn atomic_write_replaces_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Plugins.txt");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, join_lines(&["*A.esm".to_string()]).as_bytes()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "*A.esm\r\n");
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn invalid_utf8_names_the_encoding() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Plugins.txt");
        fs::write(&path, b"*Mod\xff.esp\r\n").unwrap();
        let err = read_lines(&path).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidEncoding { .. }));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("missing-dir").join("Plugins.txt");
        assert!(write_atomic(&path, b"*A.esm\r\n").is_err());
        assert!(!temp.path().join("missing-dir").exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_goes_through_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let real_dir = temp.path().join("prefix");
        fs::create_dir_all(&real_dir).unwrap();
        let real = real_dir.join("Plugins.txt");
        fs::write(&real, "old").unwrap();
        let link = temp.path().join("Plugins.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write_atomic(&link, b"*A.esm\r\n").unwrap();
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "*A.esm\r\n");
        assert!(!real_dir.join(".Plugins.txt.tmp").exists());
    }
}
