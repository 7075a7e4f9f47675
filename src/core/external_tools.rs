use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};

/*
 * This module launches the programs the comparison engine delegates to: an
 * external diff viewer for two differing files, and the platform file manager
 * for browsing one side of an entry. Both are fire-and-forget; the engine does
 * not wait for them and never changes a status because of them. Each child is
 * reaped on a background thread once it exits.
 */

/* A program plus the arguments placed before the paths it is given. */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        ExternalCommand {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn default_diff() -> Self {
        ExternalCommand::new("gvim", &["-d"])
    }

    pub fn default_file_manager() -> Self {
        if cfg!(target_os = "windows") {
            ExternalCommand::new("explorer", &[])
        } else if cfg!(target_os = "macos") {
            ExternalCommand::new("open", &[])
        } else {
            ExternalCommand::new("xdg-open", &[])
        }
    }

    /*
     * Starts the program and hands the child to a detached reaper thread, so
     * a long-lived host does not collect zombies. The returned handle yields
     * the exit status; callers are free to drop it.
     */
    pub(crate) fn spawn_with<I, S>(&self, extra: I) -> io::Result<JoinHandle<io::Result<ExitStatus>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(extra);
        log::debug!("ExternalTools: Spawning {command:?}");
        let mut child = command.spawn()?;
        let program = self.program.clone();
        thread::Builder::new()
            .name("external-tool-reaper".to_string())
            .spawn(move || {
                let status = child.wait();
                match &status {
                    Ok(status) => log::debug!("ExternalTools: '{program}' exited with {status}"),
                    Err(e) => log::warn!("ExternalTools: Waiting for '{program}' failed: {e}"),
                }
                status
            })
    }
}

/*
 * The collaborators the mutation API hands work to. Implementations only
 * start the tool; they must not block until it exits.
 */
pub trait ExternalToolOperations: Send + Sync {
    fn launch_diff(&self, left: &Path, right: &Path) -> io::Result<()>;

    /* Shows `path` in the file manager. Files are selected inside their folder where the platform allows it. */
    fn reveal_in_file_manager(&self, path: &Path, is_dir: bool) -> io::Result<()>;
}

pub struct CoreExternalToolLauncher {
    diff: ExternalCommand,
    file_manager: ExternalCommand,
}

impl CoreExternalToolLauncher {
    pub fn new(diff: ExternalCommand, file_manager: ExternalCommand) -> Self {
        CoreExternalToolLauncher { diff, file_manager }
    }

    /* The arguments that make the file manager show `path`. */
    fn file_manager_target(&self, path: &Path, is_dir: bool) -> Vec<std::ffi::OsString> {
        if is_dir {
            return vec![path.as_os_str().to_owned()];
        }
        let program = Path::new(&self.file_manager.program)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match program.as_str() {
            "explorer" => {
                let mut select = std::ffi::OsString::from("/select,");
                select.push(path.as_os_str());
                vec![select]
            }
            "open" => vec!["-R".into(), path.as_os_str().to_owned()],
            _ => {
                let folder: PathBuf = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| path.to_path_buf());
                vec![folder.into_os_string()]
            }
        }
    }
}

impl Default for CoreExternalToolLauncher {
    fn default() -> Self {
        Self::new(
            ExternalCommand::default_diff(),
            ExternalCommand::default_file_manager(),
        )
    }
}

impl ExternalToolOperations for CoreExternalToolLauncher {
    fn launch_diff(&self, left: &Path, right: &Path) -> io::Result<()> {
        log::info!("ExternalTools: Comparing {left:?} and {right:?} with '{}'", self.diff.program);
        self.diff.spawn_with([left, right]).map(drop)
    }

    fn reveal_in_file_manager(&self, path: &Path, is_dir: bool) -> io::Result<()> {
        log::info!("ExternalTools: Browsing {path:?}");
        self.file_manager
            .spawn_with(self.file_manager_target(path, is_dir))
            .map(drop)
    }
}
