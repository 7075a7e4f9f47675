/*
 * This module consolidates the platform-agnostic comparison engine: the tree
 * model and its status propagation, the builder that scans both sides, the
 * mutators that copy and delete, and the leaf utilities they rely on (path
 * probe, ignore filter, file comparator). It also holds the ambient pieces
 * around the engine: settings, compare sessions and the external tool
 * launcher.
 */
pub mod comparator;
pub mod compare_tree;
pub mod config;
pub mod external_tools;
pub mod file_system;
pub mod models;
pub mod mutators;
pub mod path_utils;
pub mod session;
pub mod tree_builder;

// Re-export the tree model
pub use compare_tree::{CompareError, CompareTree, Operation, StatusObserver};
pub use models::{Entry, EntryId, EntryKind, Side, SyncStatus};

// Re-export leaf utilities
pub use comparator::{ComparisonPolicy, FileComparator};
pub use file_system::{CoreFileSystemProbe, FileSystemProbeOperations, Presence};

// Re-export settings, sessions and external tools
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, Settings};
pub use external_tools::{CoreExternalToolLauncher, ExternalCommand, ExternalToolOperations};
pub use session::{CompareSession, CoreSessionManager, SessionError, SessionManagerOperations};
