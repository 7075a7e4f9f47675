/*
 * Path helpers shared by the configuration and session layers: locating the
 * per-user configuration directory and normalizing file names the user typed.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/* Name under which settings, the last session path and the log file are stored. */
pub const APP_NAME: &str = "DirCompare";

/*
 * Returns the local (non-roaming) configuration directory for `app_name`,
 * creating it when it does not exist yet. `None` when the platform has no such
 * directory for the current user or it cannot be created.
 */
pub fn app_config_dir(app_name: &str) -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", app_name)?;
    let config_dir = project_dirs.config_local_dir();
    match ensure_dir(config_dir) {
        Ok(()) => Some(config_dir.to_path_buf()),
        Err(e) => {
            log::error!("PathUtils: Cannot create config directory {config_dir:?}: {e}");
            None
        }
    }
}

pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    log::debug!("PathUtils: Created directory {dir:?}");
    Ok(())
}

/* Appends `.extension` unless the file name already ends with it (case-insensitively). */
pub fn with_default_extension(path: &Path, extension: &str) -> PathBuf {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_app_config_dir_is_created_and_stable() {
        let unique_app_name = format!("DirCompareTest_{}", rand::random::<u64>());

        let Some(first) = app_config_dir(&unique_app_name) else {
            // No home directory in this environment; nothing to verify.
            return;
        };
        assert!(first.is_dir());
        assert!(
            first
                .to_string_lossy()
                .to_lowercase()
                .contains(&unique_app_name.to_lowercase())
        );
        assert_eq!(app_config_dir(&unique_app_name), Some(first.clone()));

        if let Err(e) = fs::remove_dir_all(&first) {
            eprintln!("Test cleanup failed for {first:?}: {e}");
        }
    }

    #[test]
    fn test_ensure_dir_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("one").join("two");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_with_default_extension() {
        assert_eq!(
            with_default_extension(Path::new("work/session"), "dcs"),
            PathBuf::from("work/session.dcs")
        );
        assert_eq!(
            with_default_extension(Path::new("work/session.DCS"), "dcs"),
            PathBuf::from("work/session.DCS")
        );
        assert_eq!(
            with_default_extension(Path::new("notes.txt"), "dcs"),
            PathBuf::from("notes.txt.dcs")
        );
    }
}
