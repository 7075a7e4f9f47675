/*
 * This module holds the comparison tree itself. `CompareTree` owns every
 * `Entry` in an id-indexed arena: a directory owns its children through their
 * ids and each child keeps a non-owning parent id for upward notification.
 *
 * All status changes go through `set_status`, which notifies the registered
 * `StatusObserver` and, unless propagation is suppressed, asks the parent to
 * recompute its aggregate status. Bulk operations suppress propagation with a
 * scope guard and restore it on every exit path.
 *
 * The tree is not safe for concurrent mutation: only one mutating operation
 * may be in flight against a given tree at a time, which `&mut self` enforces.
 */
use super::comparator::FileComparator;
use super::file_system::{FileSystemProbeOperations, Presence};
use super::models::{Entry, EntryId, EntryKind, Side, SyncStatus, display_order};
use scopeguard::ScopeGuard;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/* The mutation or query that was attempted when an error was raised. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Copy { from: Side },
    Delete { side: Side },
    ExternalCompare,
    Browse { side: Side },
    Focus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Copy { from } => write!(f, "copy from {from} to {}", from.opposite()),
            Operation::Delete { side } => write!(f, "delete on {side}"),
            Operation::ExternalCompare => write!(f, "external compare"),
            Operation::Browse { side } => write!(f, "browse on {side}"),
            Operation::Focus => write!(f, "focus"),
        }
    }
}

#[derive(Debug)]
pub enum CompareError {
    InvalidRoot {
        side: Side,
        path: PathBuf,
    },
    UnknownEntry(EntryId),
    InvalidOperation {
        entry: String,
        operation: Operation,
        reason: String,
    },
    Io {
        entry: String,
        operation: Operation,
        source: io::Error,
    },
    ExternalTool {
        entry: String,
        operation: Operation,
        source: io::Error,
    },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareError::InvalidRoot { side, path } => {
                write!(f, "The {side} path {path:?} is not an existing directory")
            }
            CompareError::UnknownEntry(id) => write!(f, "Entry {id:?} is not part of the tree"),
            CompareError::InvalidOperation {
                entry,
                operation,
                reason,
            } => write!(f, "Cannot {operation} '{entry}': {reason}"),
            CompareError::Io {
                entry,
                operation,
                source,
            } => write!(f, "Could not {operation} '{entry}': {source}"),
            CompareError::ExternalTool {
                entry,
                operation,
                source,
            } => write!(f, "Could not launch {operation} for '{entry}': {source}"),
        }
    }
}

impl std::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompareError::Io { source, .. } => Some(source),
            CompareError::ExternalTool { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl CompareError {
    /* True for errors caused by the caller asking for something that makes no sense. */
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            CompareError::InvalidOperation { .. } | CompareError::UnknownEntry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;

/*
 * Change notification hook for the presentation layer. It is called
 * synchronously for every committed status change. Any `FnMut(&Entry)`
 * closure can be registered.
 */
pub trait StatusObserver {
    fn on_status_changed(&mut self, entry: &Entry);

    /* Called when an entry leaves the tree, either deleted on both sides or dropped by a recompare. */
    fn on_entry_removed(&mut self, _entry: &Entry) {}
}

impl<F: FnMut(&Entry)> StatusObserver for F {
    fn on_status_changed(&mut self, entry: &Entry) {
        self(entry)
    }
}

/* One arena slot. The generation is bumped each time the slot is emptied. */
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

fn lookup(entries: &[Slot], id: EntryId) -> Option<&Entry> {
    entries
        .get(id.index)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.entry.as_ref())
}

pub struct CompareTree {
    entries: Vec<Slot>,
    free_slots: Vec<usize>,
    live_entries: usize,
    root: EntryId,
    pub(crate) ignore: HashSet<String>,
    pub(crate) comparator: FileComparator,
    pub(crate) probe: Box<dyn FileSystemProbeOperations>,
    observer: Box<dyn StatusObserver>,
    propagation_enabled: bool,
}

impl CompareTree {
    /* Creates a tree holding only the unset root entry. The builder fills it in. */
    pub(crate) fn with_root(
        left_root: PathBuf,
        right_root: PathBuf,
        ignore: HashSet<String>,
        comparator: FileComparator,
        probe: Box<dyn FileSystemProbeOperations>,
        observer: Box<dyn StatusObserver>,
    ) -> Self {
        let root = EntryId::ROOT;
        let root_entry = Entry::new(
            root,
            String::new(),
            EntryKind::Directory,
            Some(left_root),
            Some(right_root),
            None,
        );
        CompareTree {
            entries: vec![Slot {
                generation: root.generation,
                entry: Some(root_entry),
            }],
            free_slots: Vec::new(),
            live_entries: 1,
            root,
            ignore,
            comparator,
            probe,
            observer,
            propagation_enabled: true,
        }
    }

    pub fn root(&self) -> EntryId {
        self.root
    }

    pub fn root_path(&self, side: Side) -> Option<PathBuf> {
        self.entry(self.root).and_then(|root| root.full_path(side))
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        lookup(&self.entries, id)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /* Empties the slot of `id` and makes it available to `add_entry` under a new generation. */
    fn take_entry(&mut self, id: EntryId) -> Option<Entry> {
        let slot = self
            .entries
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;
        let removed = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        self.live_entries -= 1;
        Some(removed)
    }

    /* Like `entry`, but a missing entry is reported as `CompareError::UnknownEntry`. */
    pub fn get(&self, id: EntryId) -> Result<&Entry> {
        self.entry(id).ok_or(CompareError::UnknownEntry(id))
    }

    pub fn status(&self, id: EntryId) -> Option<SyncStatus> {
        self.entry(id).map(Entry::status)
    }

    pub fn children(&self, id: EntryId) -> &[EntryId] {
        self.entry(id).map(Entry::children).unwrap_or(&[])
    }

    pub fn ignore(&self) -> &HashSet<String> {
        &self.ignore
    }

    pub fn comparator(&self) -> FileComparator {
        self.comparator
    }

    /* Number of entries currently in the tree, the root included. */
    pub fn len(&self) -> usize {
        self.live_entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /*
     * Registers the presentation hook, replacing the previous one.
     * A tree has exactly one observer at a time.
     */
    pub fn set_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.observer = observer;
    }

    pub fn propagation_enabled(&self) -> bool {
        self.propagation_enabled
    }

    /* All entries below `id` in pre-order, `id` itself excluded. */
    pub fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut result = Vec::new();
        let mut stack: Vec<EntryId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /* Path of the entry relative to the compared roots. The root maps to an empty path. */
    pub fn relative_path(&self, id: EntryId) -> PathBuf {
        let mut names = Vec::new();
        let mut current = self.entry(id);
        while let Some(entry) = current {
            if entry.parent.is_none() {
                break;
            }
            names.push(entry.name.as_str());
            current = entry.parent.and_then(|parent| self.entry(parent));
        }
        names.iter().rev().collect()
    }

    pub(crate) fn display_path(&self, id: EntryId) -> String {
        let relative = self.relative_path(id);
        if relative.as_os_str().is_empty() {
            ".".to_string()
        } else {
            relative.to_string_lossy().into_owned()
        }
    }

    /*
     * Finds the entry at `relative` (for example `a/x.txt`) by exact name
     * match at each level. `.` and an empty path resolve to the root.
     */
    pub fn find(&self, relative: &Path) -> Option<EntryId> {
        let mut current = self.root;
        for component in relative.components() {
            match component {
                Component::CurDir => continue,
                Component::Normal(name) => {
                    let name = name.to_str()?;
                    current = self
                        .children(current)
                        .iter()
                        .copied()
                        .find(|child| self.entry(*child).is_some_and(|e| e.name == name))?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    /* Probes the entry's full path on `side`. Never cached. */
    pub fn presence(&self, id: EntryId, side: Side) -> Presence {
        match self.entry(id).and_then(|entry| entry.full_path(side)) {
            Some(path) => self.probe.probe(&path),
            None => Presence::Absent,
        }
    }

    pub fn exists(&self, id: EntryId, side: Side) -> bool {
        self.presence(id, side).exists()
    }

    /*
     * Presence of this entry on `side`, where a path of the other kind counts
     * as absent whether or not it is readable: a directory and a file sharing
     * a name are two unrelated entries. Only `Presence::Unknown` is kept as is.
     */
    pub(crate) fn presence_for_kind(&self, id: EntryId, side: Side) -> Presence {
        let presence = self.presence(id, side);
        match (self.entry(id), presence) {
            (Some(entry), Presence::Present { kind, .. }) if kind != entry.kind => Presence::Absent,
            _ => presence,
        }
    }

    /* Appends a new unset entry below `parent`. The caller sorts the children afterwards. */
    pub(crate) fn add_entry(&mut self, parent: EntryId, name: String, kind: EntryKind) -> EntryId {
        let (left_location, right_location) = match self.entry(parent) {
            Some(parent_entry) => (
                parent_entry.full_path(Side::Left),
                parent_entry.full_path(Side::Right),
            ),
            None => {
                log::error!("CompareTree: Parent {parent:?} missing while adding '{name}'");
                (None, None)
            }
        };
        let id = match self.free_slots.pop() {
            Some(index) => EntryId {
                index,
                generation: self.entries[index].generation,
            },
            None => {
                self.entries.push(Slot {
                    generation: 0,
                    entry: None,
                });
                EntryId {
                    index: self.entries.len() - 1,
                    generation: 0,
                }
            }
        };
        self.entries[id.index].entry = Some(Entry::new(
            id,
            name,
            kind,
            left_location,
            right_location,
            Some(parent),
        ));
        self.live_entries += 1;
        if let Some(parent_entry) = self.entry_mut(parent) {
            parent_entry.children.push(id);
        }
        id
    }

    pub(crate) fn sort_children(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let mut children: Vec<&Entry> = entry
            .children
            .iter()
            .filter_map(|child| self.entry(*child))
            .collect();
        children.sort_by(|a, b| display_order(a, b));
        let sorted: Vec<EntryId> = children.iter().map(|child| child.id).collect();
        if let Some(entry) = self.entry_mut(id) {
            entry.children = sorted;
        }
    }

    /*
     * The single write path for `Entry::status`. Writing the current value is
     * a no-op. Otherwise the observer is told, and the parent recomputes its
     * own status unless this was the first assignment or propagation is
     * suppressed.
     */
    pub(crate) fn set_status(&mut self, id: EntryId, new_status: SyncStatus) {
        let Some(entry) = self.entry_mut(id) else {
            log::warn!("CompareTree: Status write to unknown entry {id:?} ignored");
            return;
        };
        if entry.status == new_status {
            return;
        }
        let old_status = std::mem::replace(&mut entry.status, new_status);
        let parent = entry.parent;
        log::trace!(
            "CompareTree: '{}' changed from {old_status} to {new_status}",
            entry.name
        );
        if let Some(entry) = lookup(&self.entries, id) {
            self.observer.on_status_changed(entry);
        }

        if old_status != SyncStatus::Unset && self.propagation_enabled {
            if let Some(parent) = parent {
                self.on_child_updated(parent, id);
            }
        }
    }

    /*
     * Recomputes a directory's status after one of its children changed. The
     * whole child list is consulted, not only `child`, and the result goes
     * through `set_status`, so the cascade stops at the first ancestor whose
     * status does not change.
     */
    pub(crate) fn on_child_updated(&mut self, parent: EntryId, child: EntryId) {
        let Some(parent_entry) = self.entry(parent) else {
            return;
        };
        if !parent_entry.is_dir() {
            log::error!(
                "CompareTree: Child update sent to file '{}', ignored",
                parent_entry.name
            );
            return;
        }
        log::debug!(
            "CompareTree: '{}' notified by child {child:?}",
            self.display_path(parent)
        );
        match self.derive_directory_status(parent) {
            Some(status) => self.set_status(parent, status),
            None => log::debug!(
                "CompareTree: '{}' is absent on both sides, status left unchanged",
                self.display_path(parent)
            ),
        }
    }

    /* `Differing` iff at least one child is not `Same`. */
    pub(crate) fn aggregate_status(&self, id: EntryId) -> SyncStatus {
        let any_difference = self
            .children(id)
            .iter()
            .any(|child| self.status(*child) != Some(SyncStatus::Same));
        if any_difference {
            SyncStatus::Differing
        } else {
            SyncStatus::Same
        }
    }

    /*
     * Status of a directory from what is on disk now plus its current
     * children. The aggregate rule only applies when both sides are readable
     * directories; otherwise the sidedness decides. `None` when the directory
     * is gone from both sides.
     */
    pub(crate) fn derive_directory_status(&self, id: EntryId) -> Option<SyncStatus> {
        let left = self.presence_for_kind(id, Side::Left);
        let right = self.presence_for_kind(id, Side::Right);
        match (left.exists(), right.exists()) {
            (true, true) => Some(
                SyncStatus::from_readability(left.is_readable(), right.is_readable())
                    .unwrap_or_else(|| self.aggregate_status(id)),
            ),
            (true, false) => Some(one_sided_status(Side::Left, left)),
            (false, true) => Some(one_sided_status(Side::Right, right)),
            (false, false) => None,
        }
    }

    /*
     * Disables propagation until the returned guard is dropped, then restores
     * the previous setting, whether the scope ends normally, through `?`, or
     * by unwinding. The guard dereferences to the tree.
     */
    pub(crate) fn suppress_propagation<'a>(
        &'a mut self,
    ) -> ScopeGuard<&'a mut Self, impl FnOnce(&'a mut Self)> {
        let previous = self.propagation_enabled;
        self.propagation_enabled = false;
        scopeguard::guard(self, move |tree| tree.propagation_enabled = previous)
    }

    /* Drops every descendant of `id`; `id` itself stays with an empty child list. */
    pub(crate) fn clear_children(&mut self, id: EntryId) {
        for descendant in self.descendants(id) {
            if let Some(removed) = self.take_entry(descendant) {
                self.observer.on_entry_removed(&removed);
            }
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.children.clear();
        }
    }

    /*
     * Removes an entry that no longer exists on either side, together with its
     * subtree, and lets the parent recompute. The root is never detached.
     */
    pub(crate) fn detach(&mut self, id: EntryId) {
        if id == self.root {
            log::error!("CompareTree: Refusing to detach the root entry");
            return;
        }
        let parent = self.entry(id).and_then(|entry| entry.parent);
        if let Some(parent) = parent {
            if let Some(parent_entry) = self.entry_mut(parent) {
                parent_entry.children.retain(|child| *child != id);
            }
        }
        self.clear_children(id);
        if let Some(removed) = self.take_entry(id) {
            log::debug!("CompareTree: '{}' removed from the tree", removed.name);
            self.observer.on_entry_removed(&removed);
        }
        if self.propagation_enabled {
            if let Some(parent) = parent {
                self.on_child_updated(parent, id);
            }
        }
    }

    pub(crate) fn invalid_operation(
        &self,
        id: EntryId,
        operation: Operation,
        reason: impl Into<String>,
    ) -> CompareError {
        let reason = reason.into();
        log::info!(
            "CompareTree: {operation} on '{}' not executed: {reason}",
            self.display_path(id)
        );
        CompareError::InvalidOperation {
            entry: self.display_path(id),
            operation,
            reason,
        }
    }

    pub(crate) fn io_error(&self, id: EntryId, operation: Operation, source: io::Error) -> CompareError {
        log::error!(
            "CompareTree: {operation} on '{}' failed: {source}",
            self.display_path(id)
        );
        CompareError::Io {
            entry: self.display_path(id),
            operation,
            source,
        }
    }
}

pub(crate) fn one_sided_status(side: Side, presence: Presence) -> SyncStatus {
    if presence.is_readable() {
        side.only_status()
    } else {
        side.only_unknown_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::file_system::CoreFileSystemProbe;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    type Log = Rc<RefCell<Vec<(String, SyncStatus)>>>;

    fn recording_tree(left: PathBuf, right: PathBuf) -> (CompareTree, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let tree = CompareTree::with_root(
            left,
            right,
            HashSet::new(),
            FileComparator::default(),
            Box::new(CoreFileSystemProbe::new()),
            Box::new(move |entry: &Entry| {
                sink.borrow_mut()
                    .push((entry.name().to_string(), entry.status()))
            }),
        );
        (tree, log)
    }

    // Builds root -> dir "a" -> files "x", "y" without touching the filesystem.
    fn small_tree(left: PathBuf, right: PathBuf) -> (CompareTree, Log, EntryId, EntryId, EntryId) {
        let (mut tree, log) = recording_tree(left, right);
        let root = tree.root();
        let a = tree.add_entry(root, "a".into(), EntryKind::Directory);
        let x = tree.add_entry(a, "x".into(), EntryKind::File);
        let y = tree.add_entry(a, "y".into(), EntryKind::File);
        tree.set_status(x, SyncStatus::Same);
        tree.set_status(y, SyncStatus::Same);
        tree.set_status(a, SyncStatus::Same);
        tree.set_status(root, SyncStatus::Same);
        log.borrow_mut().clear();
        (tree, log, a, x, y)
    }

    fn both_sides_with_dir_a() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        std::fs::create_dir_all(left.join("a")).unwrap();
        std::fs::create_dir_all(right.join("a")).unwrap();
        (dir, left, right)
    }

    #[test]
    fn test_first_assignment_does_not_propagate() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, log) = recording_tree(left, right);
        let root = tree.root();
        let a = tree.add_entry(root, "a".into(), EntryKind::Directory);
        tree.set_status(a, SyncStatus::Differing);

        assert_eq!(tree.status(root), Some(SyncStatus::Unset));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_same_value_write_is_a_no_op() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, log, _a, x, _y) = small_tree(left, right);
        tree.set_status(x, SyncStatus::Same);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_change_cascades_to_ancestors() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, log, a, x, _y) = small_tree(left, right);

        tree.set_status(x, SyncStatus::Differing);

        assert_eq!(tree.status(a), Some(SyncStatus::Differing));
        assert_eq!(tree.status(tree.root()), Some(SyncStatus::Differing));
        let names: Vec<String> = log.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["x".to_string(), "a".to_string(), String::new()]);
    }

    #[test]
    fn test_cascade_stops_when_parent_unchanged() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, log, a, x, y) = small_tree(left, right);
        tree.set_status(x, SyncStatus::Differing);
        log.borrow_mut().clear();

        tree.set_status(y, SyncStatus::Differing);

        assert_eq!(tree.status(a), Some(SyncStatus::Differing));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_suppression_is_restored_after_scope() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, a, x, _y) = small_tree(left, right);
        {
            let mut guard = tree.suppress_propagation();
            assert!(!guard.propagation_enabled());
            guard.set_status(x, SyncStatus::Differing);
        }
        assert!(tree.propagation_enabled());
        assert_eq!(tree.status(a), Some(SyncStatus::Same));
    }

    #[test]
    fn test_suppression_is_restored_on_early_return() {
        fn failing_bulk_operation(tree: &mut CompareTree) -> Result<()> {
            let guard = tree.suppress_propagation();
            Err(CompareError::UnknownEntry(guard.root()))
        }
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, _a, _x, _y) = small_tree(left, right);

        assert!(failing_bulk_operation(&mut tree).is_err());
        assert!(tree.propagation_enabled());
    }

    #[test]
    fn test_nested_suppression_restores_outer_state() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, _a, _x, _y) = small_tree(left, right);
        {
            let mut outer = tree.suppress_propagation();
            {
                let inner = outer.suppress_propagation();
                assert!(!inner.propagation_enabled());
            }
            assert!(!outer.propagation_enabled());
        }
        assert!(tree.propagation_enabled());
    }

    #[test]
    fn test_find_and_relative_path() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (tree, _log, a, x, _y) = small_tree(left.clone(), right);

        assert_eq!(tree.find(Path::new("a/x")), Some(x));
        assert_eq!(tree.find(Path::new("./a")), Some(a));
        assert_eq!(tree.find(Path::new("")), Some(tree.root()));
        assert_eq!(tree.find(Path::new("a/missing")), None);
        assert_eq!(tree.relative_path(x), PathBuf::from("a").join("x"));
        assert_eq!(tree.display_path(tree.root()), ".");
        assert_eq!(
            tree.entry(x).and_then(|e| e.left_full_path()),
            Some(left.join("a").join("x"))
        );
    }

    #[test]
    fn test_detach_removes_subtree_and_recomputes_parent() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, a, x, y) = small_tree(left, right);
        tree.set_status(x, SyncStatus::Differing);
        assert_eq!(tree.status(a), Some(SyncStatus::Differing));

        tree.detach(x);

        assert!(tree.entry(x).is_none());
        assert_eq!(tree.children(a), &[y]);
        assert_eq!(tree.status(a), Some(SyncStatus::Same));
    }

    #[test]
    fn test_detach_refuses_root() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, _a, _x, _y) = small_tree(left, right);
        let root = tree.root();
        tree.detach(root);
        assert!(tree.entry(root).is_some());
    }

    #[test]
    fn test_removed_slots_are_reused_without_reviving_old_ids() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log, a, x, _y) = small_tree(left, right);
        assert_eq!(tree.len(), 4);
        let slots = tree.entries.len();

        for round in 0..10 {
            tree.clear_children(a);
            assert_eq!(tree.len(), 2);
            let fresh = tree.add_entry(a, format!("f{round}"), EntryKind::File);
            tree.add_entry(a, format!("g{round}"), EntryKind::File);
            assert_eq!(tree.len(), 4);
            assert_eq!(tree.entry(fresh).map(Entry::name), Some(format!("f{round}").as_str()));
        }

        assert_eq!(tree.entries.len(), slots);
        assert!(tree.entry(x).is_none());
        assert!(matches!(tree.get(x), Err(CompareError::UnknownEntry(_))));
    }

    #[test]
    fn test_derive_status_uses_sidedness() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left");
        let right = dir.path().join("right");
        std::fs::create_dir_all(left.join("a")).unwrap();
        std::fs::create_dir_all(&right).unwrap();
        let (mut tree, _log) = recording_tree(left, right);
        let root = tree.root();
        let a = tree.add_entry(root, "a".into(), EntryKind::Directory);

        assert_eq!(tree.derive_directory_status(a), Some(SyncStatus::LeftOnly));
        assert_eq!(tree.derive_directory_status(root), Some(SyncStatus::Differing));
    }

    #[test]
    fn test_sort_children() {
        let (_dir, left, right) = both_sides_with_dir_a();
        let (mut tree, _log) = recording_tree(left, right);
        let root = tree.root();
        let file_b = tree.add_entry(root, "b.txt".into(), EntryKind::File);
        let dir_z = tree.add_entry(root, "Z".into(), EntryKind::Directory);
        let file_a = tree.add_entry(root, "A.txt".into(), EntryKind::File);
        tree.sort_children(root);
        assert_eq!(tree.children(root), &[dir_z, file_a, file_b]);
    }
}
