/*
 * Builds the comparison tree. A directory that exists on both sides is listed
 * on each side, filtered through the ignore set, split into directories and
 * files, and then partitioned into common and one-sided names. Common
 * directories recurse, common files go through the `FileComparator`, and
 * one-sided names are materialized as whole subtrees carrying the one-sided
 * status. Unreadable paths never abort the scan; they surface as `Unknown*`
 * statuses.
 *
 * A name that is a directory on one side and a file on the other is not
 * common: each occurrence becomes its own one-sided entry.
 */
use super::comparator::FileComparator;
use super::compare_tree::{CompareError, CompareTree, Result, StatusObserver};
use super::file_system::{
    CoreFileSystemProbe, FileSystemProbeOperations, Presence, filter_ignored,
};
use super::models::{Entry, EntryId, EntryKind, Side, SyncStatus};
use std::collections::{BTreeSet, HashSet};
use std::io;
use std::path::Path;

/* Names of one directory level, split by kind. Sorted sets keep the scan order deterministic. */
struct DirectoryListing {
    dirs: BTreeSet<String>,
    files: BTreeSet<String>,
}

impl CompareTree {
    /*
     * Compares `left_path` with `right_path`, skipping any name in `ignore` at
     * every level. Fails before any tree exists if either path is not an
     * existing directory.
     */
    pub fn build(
        left_path: &Path,
        right_path: &Path,
        ignore: &[String],
        comparator: FileComparator,
    ) -> Result<CompareTree> {
        Self::build_with(
            left_path,
            right_path,
            ignore,
            comparator,
            Box::new(CoreFileSystemProbe::new()),
            Box::new(|_: &Entry| {}),
        )
    }

    /* Same as `build`, with an explicit probe and an observer that already sees the initial statuses. */
    pub fn build_with(
        left_path: &Path,
        right_path: &Path,
        ignore: &[String],
        comparator: FileComparator,
        probe: Box<dyn FileSystemProbeOperations>,
        observer: Box<dyn StatusObserver>,
    ) -> Result<CompareTree> {
        for (side, path) in [(Side::Left, left_path), (Side::Right, right_path)] {
            if probe.probe(path).kind() != Some(EntryKind::Directory) {
                log::error!("TreeBuilder: The {side} path {path:?} is not a directory");
                return Err(CompareError::InvalidRoot {
                    side,
                    path: path.to_path_buf(),
                });
            }
        }

        let ignore: HashSet<String> = ignore.iter().cloned().collect();
        log::info!(
            "TreeBuilder: Comparing {left_path:?} with {right_path:?} ({:?}, ignoring {:?})",
            comparator.policy(),
            ignore
        );
        let mut tree = CompareTree::with_root(
            left_path.to_path_buf(),
            right_path.to_path_buf(),
            ignore,
            comparator,
            probe,
            observer,
        );
        let root = tree.root();
        tree.compare_directory(root);
        log::info!(
            "TreeBuilder: Comparison finished with {} entries, root is {}",
            tree.len(),
            tree.status(root).unwrap_or_default()
        );
        Ok(tree)
    }

    /*
     * Re-runs the comparison for an entry that is already in the tree, for
     * example after the filesystem changed behind our back. The old subtree is
     * replaced. An entry that is now gone from both sides is removed from the
     * tree; the root is marked `UnknownBoth` instead.
     */
    pub fn recompare(&mut self, id: EntryId) -> Result<()> {
        let kind = self.get(id)?.kind();
        log::debug!("TreeBuilder: Recomparing '{}'", self.display_path(id));
        let left = self.presence_for_kind(id, Side::Left);
        let right = self.presence_for_kind(id, Side::Right);
        self.clear_children(id);

        match (left.exists(), right.exists()) {
            (true, true) => match kind {
                EntryKind::Directory => self.compare_directory(id),
                EntryKind::File => self.compare_common_file(id),
            },
            (true, false) => self.materialize_one_sided(id, Side::Left),
            (false, true) => self.materialize_one_sided(id, Side::Right),
            (false, false) if id == self.root() => {
                log::warn!("TreeBuilder: Both compared roots have disappeared");
                self.set_status(id, SyncStatus::UnknownBoth);
            }
            (false, false) => self.detach(id),
        }
        Ok(())
    }

    /*
     * Fills in children and status of a directory present on both sides.
     * Either side being unreadable yields the matching `Unknown*` status and
     * no children.
     */
    pub(crate) fn compare_directory(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let (Some(left_dir), Some(right_dir)) = (entry.left_full_path(), entry.right_full_path())
        else {
            log::warn!("TreeBuilder: '{}' lacks a location", entry.name());
            self.set_status(id, SyncStatus::UnknownBoth);
            return;
        };

        let left = self.probe.probe(&left_dir);
        let right = self.probe.probe(&right_dir);
        if let Some(unknown) = SyncStatus::from_readability(left.is_readable(), right.is_readable())
        {
            self.set_status(id, unknown);
            return;
        }

        let (left_listing, right_listing) =
            match (self.read_listing(&left_dir), self.read_listing(&right_dir)) {
                (Ok(l), Ok(r)) => (l, r),
                (l, r) => {
                    // Became unreadable between the probe and the listing.
                    let status = SyncStatus::from_readability(l.is_ok(), r.is_ok())
                        .unwrap_or(SyncStatus::UnknownBoth);
                    self.set_status(id, status);
                    return;
                }
            };

        let common_dirs: BTreeSet<String> = left_listing
            .dirs
            .intersection(&right_listing.dirs)
            .cloned()
            .collect();
        let common_files: BTreeSet<String> = left_listing
            .files
            .intersection(&right_listing.files)
            .cloned()
            .collect();

        for (listing, side) in [(&left_listing, Side::Left), (&right_listing, Side::Right)] {
            let only_dirs = listing.dirs.difference(&common_dirs).cloned();
            self.add_one_sided_entries(id, only_dirs, EntryKind::Directory, side);
            let only_files = listing.files.difference(&common_files).cloned();
            self.add_one_sided_entries(id, only_files, EntryKind::File, side);
        }

        for name in common_dirs {
            let child = self.add_entry(id, name, EntryKind::Directory);
            self.compare_directory(child);
        }
        for name in common_files {
            let child = self.add_entry(id, name, EntryKind::File);
            self.compare_common_file(child);
        }

        self.sort_children(id);
        let status = self.aggregate_status(id);
        self.set_status(id, status);
    }

    /* Assigns `Same`, `Differing` or an `Unknown*` status to a file present on both sides. */
    pub(crate) fn compare_common_file(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let (Some(left_file), Some(right_file)) = (entry.left_full_path(), entry.right_full_path())
        else {
            self.set_status(id, SyncStatus::UnknownBoth);
            return;
        };

        let left = self.probe.probe(&left_file);
        let right = self.probe.probe(&right_file);
        let status = match SyncStatus::from_readability(left.is_readable(), right.is_readable()) {
            Some(unknown) => unknown,
            None => match self.comparator.files_equal(&left_file, &right_file) {
                Ok(true) => SyncStatus::Same,
                Ok(false) => SyncStatus::Differing,
                Err(e) => {
                    log::warn!(
                        "TreeBuilder: Could not compare {left_file:?} with {right_file:?}: {e}"
                    );
                    SyncStatus::UnknownBoth
                }
            },
        };
        self.set_status(id, status);
    }

    fn add_one_sided_entries(
        &mut self,
        parent: EntryId,
        names: impl Iterator<Item = String>,
        kind: EntryKind,
        side: Side,
    ) {
        for name in names {
            let child = self.add_entry(parent, name, kind);
            self.materialize_one_sided(child, side);
        }
    }

    /*
     * Builds the subtree of an entry that only exists on `side`, without any
     * comparison. Every node gets the one-sided status, except unreadable ones,
     * which get the one-sided unknown status and are not explored further.
     */
    pub(crate) fn materialize_one_sided(&mut self, id: EntryId, side: Side) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let kind = entry.kind();
        let path = entry.full_path(side);
        let presence = path
            .as_deref()
            .map(|p| self.probe.probe(p))
            .unwrap_or(Presence::Absent);

        let status = match (kind, path) {
            (EntryKind::Directory, Some(path)) if presence.is_readable() => {
                match self.read_listing(&path) {
                    Ok(listing) => {
                        self.add_one_sided_entries(
                            id,
                            listing.dirs.into_iter(),
                            EntryKind::Directory,
                            side,
                        );
                        self.add_one_sided_entries(
                            id,
                            listing.files.into_iter(),
                            EntryKind::File,
                            side,
                        );
                        self.sort_children(id);
                        side.only_status()
                    }
                    Err(_) => side.only_unknown_status(),
                }
            }
            _ if presence.is_readable() => side.only_status(),
            _ => side.only_unknown_status(),
        };
        self.set_status(id, status);
    }

    /* Lists `dir`, drops ignored names and splits the rest into directories and files. */
    fn read_listing(&self, dir: &Path) -> io::Result<DirectoryListing> {
        let names = self.probe.list_names(dir).inspect_err(|e| {
            log::warn!("TreeBuilder: Uncomparable directory {dir:?}: {e}");
        })?;
        let mut listing = DirectoryListing {
            dirs: BTreeSet::new(),
            files: BTreeSet::new(),
        };
        for name in filter_ignored(names, &self.ignore) {
            if self.probe.probe(&dir.join(&name)).kind() == Some(EntryKind::Directory) {
                listing.dirs.insert(name);
            } else {
                listing.files.insert(name);
            }
        }
        Ok(listing)
    }
}
