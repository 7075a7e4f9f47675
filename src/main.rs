use clap::{Args, Parser, Subcommand, ValueEnum};
use dir_compare::app_logic::{AppError, CommandHandler, ReportOptions};
use dir_compare::core::{
    ComparisonPolicy, ConfigManagerOperations, CoreConfigManager, CoreSessionManager, Settings,
    Side,
};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "dir_compare", version, about = "Compare two directory trees and bring them in sync")]
struct Cli {
    /// Terminal log level; the log file uses the level from the settings
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Always compare file contents, even when size and modification time match
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Args, Debug)]
struct Roots {
    left: PathBuf,
    right: PathBuf,
    /// Name to skip at every level; replaces the configured ignore list
    #[arg(long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two directories and print the result tree
    Compare {
        #[command(flatten)]
        roots: Roots,
        #[arg(long)]
        differences_only: bool,
        /// Compare only this sub-directory, given relative to the roots
        #[arg(long, value_name = "REL_PATH")]
        focus: Option<PathBuf>,
    },
    /// Copy an entry to the other side
    Copy {
        #[command(flatten)]
        roots: Roots,
        path: PathBuf,
        #[arg(long, value_enum)]
        from: SideArg,
    },
    /// Delete an entry on one side
    Delete {
        #[command(flatten)]
        roots: Roots,
        path: PathBuf,
        #[arg(long, value_enum)]
        side: SideArg,
    },
    /// Open a differing file pair in the external diff viewer
    Diff {
        #[command(flatten)]
        roots: Roots,
        path: PathBuf,
    },
    /// Show an entry in the file manager
    Browse {
        #[command(flatten)]
        roots: Roots,
        path: PathBuf,
        #[arg(long, value_enum)]
        side: SideArg,
    },
    /// Save or run compare sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Save the two roots and the ignore list to a .dcs file
    Save {
        file: PathBuf,
        #[command(flatten)]
        roots: Roots,
        /// Save the session narrowed to this sub-directory
        #[arg(long, value_name = "REL_PATH")]
        focus: Option<PathBuf>,
    },
    /// Compare a saved session, by default the last one used
    Run {
        file: Option<PathBuf>,
        #[arg(long)]
        differences_only: bool,
    },
}

fn init_logging(cli: &Cli, settings: &Settings, config_manager: &dyn ConfigManagerOperations) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        cli.log_level.to_filter(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    match config_manager.config_dir() {
        Ok(config_dir) => {
            let log_path = settings.log_file_path(&config_dir);
            match OpenOptions::new().create(true).append(true).open(&log_path) {
                Ok(file) => loggers.push(WriteLogger::new(
                    settings.log_level_filter(),
                    Config::default(),
                    file,
                )),
                Err(e) => eprintln!("Warning: cannot open log file {log_path:?}: {e}"),
            }
        }
        Err(e) => eprintln!("Warning: no log file: {e}"),
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Warning: logging is not available: {e}");
    }
}

fn run(cli: Cli, handler: &CommandHandler) -> Result<String, AppError> {
    match cli.command {
        Command::Compare {
            roots,
            differences_only,
            focus,
        } => {
            let mut session = handler.session_for(roots.left, roots.right, roots.ignore);
            if let Some(relative) = focus {
                session = handler.focus(&session, &relative)?;
            }
            handler.compare(&session, &ReportOptions { differences_only })
        }
        Command::Copy { roots, path, from } => {
            let session = handler.session_for(roots.left, roots.right, roots.ignore);
            handler.copy(&session, &path, from.into())
        }
        Command::Delete { roots, path, side } => {
            let session = handler.session_for(roots.left, roots.right, roots.ignore);
            handler.delete(&session, &path, side.into())
        }
        Command::Diff { roots, path } => {
            let session = handler.session_for(roots.left, roots.right, roots.ignore);
            handler.diff(&session, &path)
        }
        Command::Browse { roots, path, side } => {
            let session = handler.session_for(roots.left, roots.right, roots.ignore);
            handler.browse(&session, &path, side.into())
        }
        Command::Session(SessionCommand::Save { file, roots, focus }) => {
            let mut session = handler.session_for(roots.left, roots.right, roots.ignore);
            if let Some(relative) = focus {
                session = handler.focus(&session, &relative)?;
            }
            handler.save_session(&file, &session)
        }
        Command::Session(SessionCommand::Run {
            file,
            differences_only,
        }) => handler.run_session(file.as_deref(), &ReportOptions { differences_only }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_manager = Arc::new(CoreConfigManager::new());
    let mut settings = match config_manager.load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: {e}; using default settings");
            Settings::default()
        }
    };
    init_logging(&cli, &settings, config_manager.as_ref());
    log::debug!("Main: Parsed CLI arguments: {cli:?}");

    if cli.strict {
        settings.comparison_policy = ComparisonPolicy::Strict;
    }
    let tools = Arc::new(settings.launcher());
    let handler = CommandHandler::new(
        settings,
        config_manager,
        Arc::new(CoreSessionManager::new()),
        tools,
    );

    match run(cli, &handler) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Main: {e}");
            eprintln!("Error: {e}");
            if e.is_usage_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
