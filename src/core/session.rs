/*
 * A compare session is the value object that starts a comparison: the two
 * roots and the ignore list. Sessions can be saved to and loaded from `.dcs`
 * files (pretty JSON), and a new session can be derived from a directory of an
 * existing tree to re-root the comparison there.
 */
use super::comparator::FileComparator;
use super::compare_tree::{self, CompareTree, Operation};
use super::models::{EntryId, Side};
use super::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const SESSION_FILE_EXTENSION: &str = "dcs";

#[derive(Debug)]
pub enum SessionError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Io(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serde(err)
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "Session file I/O error: {e}"),
            SessionError::Serde(e) => write!(f, "Malformed session file: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Io(e) => Some(e),
            SessionError::Serde(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSession {
    pub left_path: PathBuf,
    pub right_path: PathBuf,
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl CompareSession {
    pub fn new(left_path: PathBuf, right_path: PathBuf, ignore: Vec<String>) -> Self {
        CompareSession {
            left_path,
            right_path,
            ignore,
        }
    }

    pub fn compare(&self, comparator: FileComparator) -> compare_tree::Result<CompareTree> {
        CompareTree::build(&self.left_path, &self.right_path, &self.ignore, comparator)
    }

    /*
     * Derives a session rooted at directory `id` of `tree`, keeping the ignore
     * list. The directory must exist on both sides.
     */
    pub fn focus(&self, tree: &CompareTree, id: EntryId) -> compare_tree::Result<CompareSession> {
        let entry = tree.get(id)?;
        let both_sides = tree.presence_for_kind(id, Side::Left).exists()
            && tree.presence_for_kind(id, Side::Right).exists();
        match (entry.left_full_path(), entry.right_full_path()) {
            (Some(left), Some(right)) if entry.is_dir() && both_sides => {
                log::info!("CompareSession: Focusing on {left:?} and {right:?}");
                Ok(CompareSession::new(left, right, self.ignore.clone()))
            }
            _ => Err(tree.invalid_operation(
                id,
                Operation::Focus,
                "only directories present on both sides can be focused",
            )),
        }
    }
}

pub trait SessionManagerOperations: Send + Sync {
    /* Writes the session and returns the path actually used, with the `.dcs` extension added if missing. */
    fn save_session(&self, path: &Path, session: &CompareSession) -> Result<PathBuf>;
    fn load_session(&self, path: &Path) -> Result<CompareSession>;
}

pub struct CoreSessionManager {}

impl CoreSessionManager {
    pub fn new() -> Self {
        CoreSessionManager {}
    }
}

impl Default for CoreSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManagerOperations for CoreSessionManager {
    fn save_session(&self, path: &Path, session: &CompareSession) -> Result<PathBuf> {
        let file_path = path_utils::with_default_extension(path, SESSION_FILE_EXTENSION);
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            path_utils::ensure_dir(parent)?;
        }
        let writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(writer, session)?;
        log::debug!("CoreSessionManager: Saved session to {file_path:?}.");
        Ok(file_path)
    }

    fn load_session(&self, path: &Path) -> Result<CompareSession> {
        let reader = BufReader::new(File::open(path)?);
        let session: CompareSession = serde_json::from_reader(reader)?;
        log::debug!(
            "CoreSessionManager: Loaded session {:?} <-> {:?} from {path:?}.",
            session.left_path,
            session.right_path
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comparator::ComparisonPolicy;
    use crate::core::models::SyncStatus;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_save_adds_extension_and_load_reads_it_back() {
        let dir = tempdir().unwrap();
        let manager = CoreSessionManager::new();
        let session = CompareSession::new(
            PathBuf::from("/data/left"),
            PathBuf::from("/data/right"),
            vec![".svn".to_string()],
        );

        let saved = manager
            .save_session(&dir.path().join("nested").join("work"), &session)
            .unwrap();

        assert_eq!(saved, dir.path().join("nested").join("work.dcs"));
        assert_eq!(manager.load_session(&saved).unwrap(), session);
    }

    #[test]
    fn test_load_without_ignore_field_and_broken_file() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.dcs");
        fs::write(&good, r#"{"left_path":"/l","right_path":"/r"}"#).unwrap();
        let broken = dir.path().join("broken.dcs");
        fs::write(&broken, "left=/l").unwrap();
        let manager = CoreSessionManager::new();

        assert!(manager.load_session(&good).unwrap().ignore.is_empty());
        assert!(matches!(
            manager.load_session(&broken),
            Err(SessionError::Serde(_))
        ));
        assert!(matches!(
            manager.load_session(&dir.path().join("missing.dcs")),
            Err(SessionError::Io(_))
        ));
    }

    #[test]
    fn test_focus_on_common_directory() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        fs::create_dir_all(left.join("sub/.svn")).unwrap();
        fs::create_dir_all(right.join("sub")).unwrap();
        fs::create_dir_all(left.join("lonely")).unwrap();
        fs::write(left.join("sub/x.txt"), "1").unwrap();
        fs::write(right.join("sub/x.txt"), "2").unwrap();
        let session = CompareSession::new(left.clone(), right.clone(), vec![".svn".to_string()]);
        let comparator = FileComparator::new(ComparisonPolicy::Strict);
        let tree = session.compare(comparator).unwrap();

        let sub = tree.find(Path::new("sub")).unwrap();
        let focused = session.focus(&tree, sub).unwrap();
        assert_eq!(focused.left_path, left.join("sub"));
        assert_eq!(focused.right_path, right.join("sub"));
        assert_eq!(focused.ignore, session.ignore);

        let focused_tree = focused.compare(comparator).unwrap();
        assert_eq!(
            focused_tree.status(focused_tree.root()),
            Some(SyncStatus::Differing)
        );
        assert_eq!(focused_tree.children(focused_tree.root()).len(), 1);

        let lonely = tree.find(Path::new("lonely")).unwrap();
        assert!(session.focus(&tree, lonely).unwrap_err().is_caller_error());
        let x = tree.find(Path::new("sub/x.txt")).unwrap();
        assert!(session.focus(&tree, x).is_err());
    }

    #[test]
    fn test_focus_refuses_directory_shadowed_by_file() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        fs::create_dir_all(left.join("name")).unwrap();
        fs::create_dir_all(&right).unwrap();
        fs::write(right.join("name"), "file").unwrap();
        let session = CompareSession::new(left, right, Vec::new());
        let tree = session.compare(FileComparator::default()).unwrap();

        let name = tree.find(Path::new("name")).unwrap();
        assert!(tree.entry(name).unwrap().is_dir());
        assert!(session.focus(&tree, name).unwrap_err().is_caller_error());
    }
}
