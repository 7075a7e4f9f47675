/*
 * Operations that change the filesystem on one side and then bring the tree
 * back in line with it: copying an entry across, deleting it on one side, and
 * handing a pair of files to the external diff viewer.
 *
 * Bulk work on a subtree runs with propagation suppressed; the operation then
 * decides the status of the subtree root itself and lets that single write
 * propagate upwards. A failed filesystem call never leaves an optimistic status
 * behind: the entry is recompared from disk before the error is returned.
 */
use super::compare_tree::{CompareError, CompareTree, Operation, Result, one_sided_status};
use super::external_tools::ExternalToolOperations;
use super::models::{EntryId, EntryKind, Side, SyncStatus};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

impl CompareTree {
    /*
     * Copies the entry from `from` to the opposite side. Files are copied
     * byte for byte, creating missing parent directories. A directory missing
     * on the destination is copied as a whole; an existing one is merged child
     * by child and its status recomputed afterwards, so it only becomes `Same`
     * if every child ended up `Same`.
     */
    pub fn copy_to(&mut self, id: EntryId, from: Side) -> Result<()> {
        let operation = Operation::Copy { from };
        let entry = self.get(id)?;
        let (kind, status) = (entry.kind(), entry.status());
        if !status.permits_copy(kind, from) {
            return Err(self.invalid_operation(
                id,
                operation,
                format!("nothing to copy while the status is {status}"),
            ));
        }

        log::info!(
            "Mutators: Copying '{}' from {from} to {}",
            self.display_path(id),
            from.opposite()
        );
        let result = self.copy_entry(id, from);
        if let Err(CompareError::Io { .. }) = result {
            self.refresh_after_failure(id);
        }
        result
    }

    fn copy_entry(&mut self, id: EntryId, from: Side) -> Result<()> {
        let operation = Operation::Copy { from };
        let entry = self.get(id)?;
        let kind = entry.kind();
        let (Some(source), Some(destination)) =
            (entry.full_path(from), entry.full_path(from.opposite()))
        else {
            return Err(self.invalid_operation(id, operation, "entry has no location"));
        };

        let source_presence = self.probe.probe(&source);
        if source_presence.kind() != Some(kind) || !source_presence.is_readable() {
            return Err(self.invalid_operation(
                id,
                operation,
                format!("{source:?} is missing or unreadable"),
            ));
        }
        let destination_presence = self.probe.probe(&destination);
        if destination_presence.kind().is_some_and(|other| other != kind) {
            return Err(self.invalid_operation(
                id,
                operation,
                format!("{destination:?} exists and is not the same kind of entry"),
            ));
        }

        match kind {
            EntryKind::File => {
                copy_file(&source, &destination).map_err(|e| self.io_error(id, operation, e))?;
                self.set_status(id, SyncStatus::Same);
            }
            EntryKind::Directory if !destination_presence.exists() => {
                copy_tree(&source, &destination).map_err(|e| self.io_error(id, operation, e))?;
                self.mark_copied_subtree(id, from);
                self.set_status(id, SyncStatus::Same);
            }
            EntryKind::Directory => {
                self.merge_directory(id, from)?;
            }
        }
        log::debug!("Mutators: Copied {source:?} to {destination:?}");
        Ok(())
    }

    /* After a whole-tree copy every descendant that came from `from` is now `Same`. */
    fn mark_copied_subtree(&mut self, id: EntryId, from: Side) {
        let mut tree = self.suppress_propagation();
        for descendant in tree.descendants(id) {
            if tree.entry(descendant).is_none() {
                continue;
            }
            if tree.presence_for_kind(descendant, from).exists() {
                tree.set_status(descendant, SyncStatus::Same);
            } else {
                tree.detach(descendant);
            }
        }
    }

    fn merge_directory(&mut self, id: EntryId, from: Side) -> Result<()> {
        {
            let mut tree = self.suppress_propagation();
            for child in tree.children(id).to_vec() {
                let Some(entry) = tree.entry(child) else {
                    continue;
                };
                if !entry.status().permits_copy(entry.kind(), from) {
                    continue;
                }
                match tree.copy_entry(child, from) {
                    Err(e) if e.is_caller_error() => {}
                    other => other?,
                }
            }
        }
        if let Some(status) = self.derive_directory_status(id) {
            self.set_status(id, status);
        }
        Ok(())
    }

    /*
     * Removes the entry on `side`. Afterwards the entry carries the one-sided
     * status of the other side, or leaves the tree when nothing is left on
     * either side. Deleting on a side where the entry does not exist only
     * re-derives the status. The compared roots cannot be deleted.
     */
    pub fn delete(&mut self, id: EntryId, side: Side) -> Result<()> {
        let operation = Operation::Delete { side };
        self.get(id)?;
        if id == self.root() {
            return Err(self.invalid_operation(id, operation, "the compared roots cannot be deleted"));
        }

        let presence = self.presence_for_kind(id, side);
        let path = self.entry(id).and_then(|entry| entry.full_path(side));
        match path {
            Some(path) if presence.exists() => {
                log::info!("Mutators: Deleting {path:?}");
                if let Err(e) = remove_path(&path) {
                    let error = self.io_error(id, operation, e);
                    self.refresh_after_failure(id);
                    return Err(error);
                }
            }
            _ => log::debug!(
                "Mutators: '{}' does not exist on the {side} side",
                self.display_path(id)
            ),
        }
        self.settle_after_delete(id, side);
        Ok(())
    }

    fn settle_after_delete(&mut self, id: EntryId, deleted_side: Side) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let (kind, previous) = (entry.kind(), entry.status());
        let other = deleted_side.opposite();
        let remaining = self.presence_for_kind(id, other);
        if !remaining.exists() {
            self.detach(id);
            return;
        }
        if self.presence_for_kind(id, deleted_side).exists() {
            // Something reappeared on the deleted side; only a full comparison can tell.
            if let Err(e) = self.recompare(id) {
                log::warn!("Mutators: Recompare after delete failed: {e}");
            }
            return;
        }

        let status = one_sided_status(other, remaining);
        if kind == EntryKind::Directory {
            if previous.is_unknown() && remaining.is_readable() {
                // Children were never read; build them from the remaining side.
                self.clear_children(id);
                self.materialize_one_sided(id, other);
                return;
            }
            let mut tree = self.suppress_propagation();
            for child in tree.children(id).to_vec() {
                tree.settle_after_delete(child, deleted_side);
            }
        }
        self.set_status(id, status);
    }

    pub fn can_compare_externally(&self, id: EntryId) -> bool {
        self.entry(id).is_some_and(|entry| {
            entry.kind() == EntryKind::File && entry.status() == SyncStatus::Differing
        })
    }

    /*
     * Opens the external diff viewer on both sides of a differing file.
     * The status is not touched; it changes on the next recompare.
     */
    pub fn request_external_compare(
        &self,
        id: EntryId,
        tools: &dyn ExternalToolOperations,
    ) -> Result<()> {
        let operation = Operation::ExternalCompare;
        let entry = self.get(id)?;
        if !self.can_compare_externally(id) {
            return Err(self.invalid_operation(
                id,
                operation,
                format!("only differing files can be compared, this is {}", entry.status()),
            ));
        }
        let (Some(left), Some(right)) = (entry.left_full_path(), entry.right_full_path()) else {
            return Err(self.invalid_operation(id, operation, "entry has no location"));
        };
        tools
            .launch_diff(&left, &right)
            .map_err(|source| self.external_tool_error(id, operation, source))
    }

    pub fn can_browse(&self, id: EntryId, side: Side) -> bool {
        self.exists(id, side)
    }

    /* Shows the entry's path on `side` in the file manager. */
    pub fn browse(&self, id: EntryId, side: Side, tools: &dyn ExternalToolOperations) -> Result<()> {
        let operation = Operation::Browse { side };
        let entry = self.get(id)?;
        let path = match entry.full_path(side) {
            Some(path) if self.can_browse(id, side) => path,
            _ => {
                return Err(self.invalid_operation(
                    id,
                    operation,
                    format!("it does not exist on the {side} side"),
                ));
            }
        };
        tools
            .reveal_in_file_manager(&path, entry.is_dir())
            .map_err(|source| self.external_tool_error(id, operation, source))
    }

    fn external_tool_error(&self, id: EntryId, operation: Operation, source: io::Error) -> CompareError {
        log::error!(
            "Mutators: {operation} on '{}' could not start: {source}",
            self.display_path(id)
        );
        CompareError::ExternalTool {
            entry: self.display_path(id),
            operation,
            source,
        }
    }

    /* Re-reads an entry after a failed mutation so its status reflects what actually happened. */
    fn refresh_after_failure(&mut self, id: EntryId) {
        if self.entry(id).is_none() {
            return;
        }
        if let Err(e) = self.recompare(id) {
            log::warn!("Mutators: Could not refresh after failure: {e}");
        }
    }
}

fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;
    Ok(())
}

/* Copies the directory `source` to the not yet existing `destination`, ignored names included. */
fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for dir_entry in WalkDir::new(source) {
        let dir_entry = dir_entry.map_err(io::Error::other)?;
        let relative = dir_entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);
        if dir_entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_file(dir_entry.path(), &target)?;
        }
    }
    Ok(())
}

/* Removes a file, a link, or a whole directory tree. Links are never followed. */
fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
