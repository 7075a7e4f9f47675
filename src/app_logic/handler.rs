use super::report::{ReportOptions, StatusSummary, render_report};
use crate::core::{
    CompareError, CompareSession, CompareTree, ConfigError, ConfigManagerOperations, Entry,
    EntryId, ExternalToolOperations, SessionError, SessionManagerOperations, Settings, Side,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum AppError {
    Compare(CompareError),
    Config(ConfigError),
    Session(SessionError),
    /* The relative path given on the command line matches no entry of the tree. */
    EntryNotFound(PathBuf),
    /* No session file was given and none was used before. */
    NoSession,
}

impl From<CompareError> for AppError {
    fn from(err: CompareError) -> Self {
        AppError::Compare(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Compare(e) => write!(f, "{e}"),
            AppError::Config(e) => write!(f, "{e}"),
            AppError::Session(e) => write!(f, "{e}"),
            AppError::EntryNotFound(path) => {
                write!(f, "No entry {path:?} in the comparison")
            }
            AppError::NoSession => write!(f, "No session file given and no previous session known"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Compare(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl AppError {
    /* Errors caused by what the user asked for rather than by the environment. */
    pub fn is_usage_error(&self) -> bool {
        match self {
            AppError::Compare(e) => e.is_caller_error(),
            AppError::EntryNotFound(_) | AppError::NoSession => true,
            _ => false,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/*
 * Executes the user-level commands of the tool. Every command that needs a
 * tree compares the session from scratch, because the filesystem is the only
 * state that survives between invocations. Storage and external programs are
 * reached through the injected `*Operations` traits so the handler can be
 * tested without touching the user's configuration or spawning processes.
 */
pub struct CommandHandler {
    pub(crate) settings: Settings,
    pub(crate) config_manager: Arc<dyn ConfigManagerOperations>,
    pub(crate) session_manager: Arc<dyn SessionManagerOperations>,
    pub(crate) tools: Arc<dyn ExternalToolOperations>,
}

impl CommandHandler {
    pub fn new(
        settings: Settings,
        config_manager: Arc<dyn ConfigManagerOperations>,
        session_manager: Arc<dyn SessionManagerOperations>,
        tools: Arc<dyn ExternalToolOperations>,
    ) -> Self {
        CommandHandler {
            settings,
            config_manager,
            session_manager,
            tools,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /* A session for the two roots. An empty `ignore` means the configured default list. */
    pub fn session_for(&self, left: PathBuf, right: PathBuf, ignore: Vec<String>) -> CompareSession {
        let ignore = if ignore.is_empty() {
            self.settings.ignore.clone()
        } else {
            ignore
        };
        CompareSession::new(left, right, ignore)
    }

    fn open_tree(&self, session: &CompareSession) -> AppResult<CompareTree> {
        let mut tree = session.compare(self.settings.comparator())?;
        tree.set_observer(Box::new(|entry: &Entry| {
            log::debug!(
                "CommandHandler: '{}' is now {}",
                entry.name(),
                entry.status()
            );
        }));
        Ok(tree)
    }

    fn locate(tree: &CompareTree, relative: &Path) -> AppResult<EntryId> {
        tree.find(relative).ok_or_else(|| {
            log::warn!("CommandHandler: {relative:?} not found in the comparison");
            AppError::EntryNotFound(relative.to_path_buf())
        })
    }

    /* One line describing where `relative` stands now, including the overall result. */
    fn describe_outcome(tree: &CompareTree, id: EntryId, relative: &Path) -> String {
        let root_status = tree.status(tree.root()).unwrap_or_default();
        match tree.status(id) {
            Some(status) => format!(
                "{} is now {status}; roots are {root_status}",
                relative.display()
            ),
            None => format!(
                "{} is gone from both sides; roots are {root_status}",
                relative.display()
            ),
        }
    }

    /* Narrows `session` to the directory at `relative`, which must exist on both sides. */
    pub fn focus(&self, session: &CompareSession, relative: &Path) -> AppResult<CompareSession> {
        let tree = self.open_tree(session)?;
        let id = Self::locate(&tree, relative)?;
        Ok(session.focus(&tree, id)?)
    }

    pub fn compare(&self, session: &CompareSession, options: &ReportOptions) -> AppResult<String> {
        log::info!(
            "CommandHandler: Comparing {:?} with {:?}",
            session.left_path,
            session.right_path
        );
        let tree = self.open_tree(session)?;
        let summary = StatusSummary::from_tree(&tree);
        log::info!("CommandHandler: {summary}");
        Ok(render_report(&tree, options))
    }

    pub fn copy(&self, session: &CompareSession, relative: &Path, from: Side) -> AppResult<String> {
        let mut tree = self.open_tree(session)?;
        let id = Self::locate(&tree, relative)?;
        tree.copy_to(id, from)?;
        Ok(Self::describe_outcome(&tree, id, relative))
    }

    pub fn delete(&self, session: &CompareSession, relative: &Path, side: Side) -> AppResult<String> {
        let mut tree = self.open_tree(session)?;
        let id = Self::locate(&tree, relative)?;
        tree.delete(id, side)?;
        Ok(Self::describe_outcome(&tree, id, relative))
    }

    pub fn diff(&self, session: &CompareSession, relative: &Path) -> AppResult<String> {
        let tree = self.open_tree(session)?;
        let id = Self::locate(&tree, relative)?;
        tree.request_external_compare(id, self.tools.as_ref())?;
        Ok(format!("Opened the diff viewer for {}", relative.display()))
    }

    pub fn browse(&self, session: &CompareSession, relative: &Path, side: Side) -> AppResult<String> {
        let tree = self.open_tree(session)?;
        let id = Self::locate(&tree, relative)?;
        tree.browse(id, side, self.tools.as_ref())?;
        Ok(format!("Opened {} on the {side} side", relative.display()))
    }

    /* Saves the session and remembers it as the last one used. */
    pub fn save_session(&self, path: &Path, session: &CompareSession) -> AppResult<String> {
        let saved = self.session_manager.save_session(path, session)?;
        if let Err(e) = self.config_manager.save_last_session_path(Some(saved.as_path())) {
            log::warn!("CommandHandler: Could not remember the last session: {e}");
        }
        Ok(format!("Session saved to {}", saved.display()))
    }

    /* Loads the session at `path`, or the last used one when no path is given. */
    pub fn load_session(&self, path: Option<&Path>) -> AppResult<CompareSession> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self
                .config_manager
                .load_last_session_path()?
                .ok_or(AppError::NoSession)?,
        };
        let session = self.session_manager.load_session(&path)?;
        if let Err(e) = self.config_manager.save_last_session_path(Some(path.as_path())) {
            log::warn!("CommandHandler: Could not remember the last session: {e}");
        }
        Ok(session)
    }

    pub fn run_session(&self, path: Option<&Path>, options: &ReportOptions) -> AppResult<String> {
        let session = self.load_session(path)?;
        self.compare(&session, options)
    }
}
