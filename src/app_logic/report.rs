/*
 * Renders a comparison tree as indented text, one line per entry, with a
 * marker column for the status:
 *
 *   =  same          !  differing
 *   <  left only     >  right only
 *   ?  unknown or unreadable
 *
 * A per-status summary is appended at the end.
 */
use crate::core::{CompareTree, EntryId, Side, SyncStatus};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /* Skip entries (and their subtrees) whose status is `Same`. */
    pub differences_only: bool,
}

pub fn status_marker(status: SyncStatus) -> char {
    match status {
        SyncStatus::Same => '=',
        SyncStatus::Differing => '!',
        SyncStatus::LeftOnly => '<',
        SyncStatus::RightOnly => '>',
        SyncStatus::Unset => ' ',
        _ => '?',
    }
}

/* Counts of non-root entries per status group. */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub same: usize,
    pub differing: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub unknown: usize,
}

impl StatusSummary {
    pub fn from_tree(tree: &CompareTree) -> Self {
        let mut summary = StatusSummary::default();
        for id in tree.descendants(tree.root()) {
            match tree.status(id) {
                Some(SyncStatus::Same) => summary.same += 1,
                Some(SyncStatus::Differing) => summary.differing += 1,
                Some(SyncStatus::LeftOnly) => summary.left_only += 1,
                Some(SyncStatus::RightOnly) => summary.right_only += 1,
                Some(status) if status.is_unknown() => summary.unknown += 1,
                _ => {}
            }
        }
        summary
    }

    pub fn is_in_sync(&self) -> bool {
        self.differing + self.left_only + self.right_only + self.unknown == 0
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} same, {} differing, {} left only, {} right only, {} unknown",
            self.same, self.differing, self.left_only, self.right_only, self.unknown
        )
    }
}

pub fn render_report(tree: &CompareTree, options: &ReportOptions) -> String {
    let mut out = String::new();
    let root = tree.root();
    for side in [Side::Left, Side::Right] {
        let root_path = tree
            .root_path(side)
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{:<6} {root_path}", format!("{side}:"));
    }
    let root_status = tree.status(root).unwrap_or_default();
    let _ = writeln!(out, "{} . [{root_status}]", status_marker(root_status));
    for child in tree.children(root) {
        render_entry(tree, *child, 1, options, &mut out);
    }
    let _ = write!(out, "{}", StatusSummary::from_tree(tree));
    out
}

fn render_entry(
    tree: &CompareTree,
    id: EntryId,
    depth: usize,
    options: &ReportOptions,
    out: &mut String,
) {
    let Some(entry) = tree.entry(id) else {
        return;
    };
    if options.differences_only && entry.status() == SyncStatus::Same {
        return;
    }
    let suffix = if entry.is_dir() { "/" } else { "" };
    let _ = writeln!(
        out,
        "{} {:indent$}{}{suffix} [{}]",
        status_marker(entry.status()),
        "",
        entry.name(),
        entry.status(),
        indent = depth * 2
    );
    for child in entry.children() {
        render_entry(tree, *child, depth + 1, options, out);
    }
}
