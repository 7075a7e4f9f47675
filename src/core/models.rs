use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/*
 * Identifies one of the two directory trees being compared.
 * Every side-dependent accessor (location, full path, existence) is keyed by
 * this enum instead of by a property name.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /* The status of an entry that exists readably on this side only. */
    pub fn only_status(self) -> SyncStatus {
        match self {
            Side::Left => SyncStatus::LeftOnly,
            Side::Right => SyncStatus::RightOnly,
        }
    }

    /* The status of an entry that exists on this side only but cannot be read. */
    pub fn only_unknown_status(self) -> SyncStatus {
        match self {
            Side::Left => SyncStatus::LeftOnlyUnknown,
            Side::Right => SyncStatus::RightOnlyUnknown,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/*
 * The synchronization status of an entry.
 * `Unset` is only observed between construction and the first assignment; the
 * first assignment never notifies the parent. The `Unknown*` family marks
 * paths whose existence or readability could not be established.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncStatus {
    #[default]
    Unset,
    Same,
    Differing,
    LeftOnly,
    RightOnly,
    UnknownBoth,
    UnknownLeft,
    UnknownRight,
    LeftOnlyUnknown,
    RightOnlyUnknown,
}

impl SyncStatus {
    /* The status the same entry would have if left and right were swapped. */
    pub fn mirrored(self) -> SyncStatus {
        match self {
            SyncStatus::LeftOnly => SyncStatus::RightOnly,
            SyncStatus::RightOnly => SyncStatus::LeftOnly,
            SyncStatus::UnknownLeft => SyncStatus::UnknownRight,
            SyncStatus::UnknownRight => SyncStatus::UnknownLeft,
            SyncStatus::LeftOnlyUnknown => SyncStatus::RightOnlyUnknown,
            SyncStatus::RightOnlyUnknown => SyncStatus::LeftOnlyUnknown,
            other => other,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(
            self,
            SyncStatus::UnknownBoth
                | SyncStatus::UnknownLeft
                | SyncStatus::UnknownRight
                | SyncStatus::LeftOnlyUnknown
                | SyncStatus::RightOnlyUnknown
        )
    }

    /*
     * Status derived from the readability of both sides of a common entry,
     * or `None` when both sides are readable and a real comparison is needed.
     */
    pub fn from_readability(left_readable: bool, right_readable: bool) -> Option<SyncStatus> {
        match (left_readable, right_readable) {
            (true, true) => None,
            (false, false) => Some(SyncStatus::UnknownBoth),
            (false, true) => Some(SyncStatus::UnknownLeft),
            (true, false) => Some(SyncStatus::UnknownRight),
        }
    }

    /*
     * Whether copying an entry of `kind` from `from` to the other side is a
     * meaningful request in this status. Unknown statuses only allow copying
     * files, and only from the side that was readable.
     */
    pub fn permits_copy(self, kind: EntryKind, from: Side) -> bool {
        match self {
            SyncStatus::Differing => true,
            SyncStatus::LeftOnly => from == Side::Left,
            SyncStatus::RightOnly => from == Side::Right,
            SyncStatus::UnknownRight => kind == EntryKind::File && from == Side::Left,
            SyncStatus::UnknownLeft => kind == EntryKind::File && from == Side::Right,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Unset => "unset",
            SyncStatus::Same => "same",
            SyncStatus::Differing => "differing",
            SyncStatus::LeftOnly => "left only",
            SyncStatus::RightOnly => "right only",
            SyncStatus::UnknownBoth => "unknown (both)",
            SyncStatus::UnknownLeft => "unknown (left)",
            SyncStatus::UnknownRight => "unknown (right)",
            SyncStatus::LeftOnlyUnknown => "left only, unreadable",
            SyncStatus::RightOnlyUnknown => "right only, unreadable",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/*
 * Handle of an entry inside its `CompareTree`: a slot index plus the slot's
 * generation. Slots of removed entries are reused, but with a new generation,
 * so a stale id never resolves to a different entry.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl EntryId {
    pub(crate) const ROOT: EntryId = EntryId {
        index: 0,
        generation: 0,
    };
}

/*
 * One node of the comparison tree.
 * The locations are the *parent directory* on each side; the full path is the
 * location joined with the name. The synthetic root has an empty name and its
 * locations are the two compared roots themselves. Children are owned by the
 * tree and referenced by id; `parent` is a plain back-reference used only for
 * upward notification.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub(crate) id: EntryId,
    pub(crate) name: String,
    pub(crate) kind: EntryKind,
    pub(crate) status: SyncStatus,
    pub(crate) left_location: Option<PathBuf>,
    pub(crate) right_location: Option<PathBuf>,
    pub(crate) parent: Option<EntryId>,
    pub(crate) children: Vec<EntryId>,
}

impl Entry {
    pub(crate) fn new(
        id: EntryId,
        name: String,
        kind: EntryKind,
        left_location: Option<PathBuf>,
        right_location: Option<PathBuf>,
        parent: Option<EntryId>,
    ) -> Self {
        Entry {
            id,
            name,
            kind,
            status: SyncStatus::Unset,
            left_location,
            right_location,
            parent,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    /* Always empty for files and for directories that were not read. */
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }

    pub fn location(&self, side: Side) -> Option<&PathBuf> {
        match side {
            Side::Left => self.left_location.as_ref(),
            Side::Right => self.right_location.as_ref(),
        }
    }

    pub fn full_path(&self, side: Side) -> Option<PathBuf> {
        self.location(side).map(|location| {
            if self.name.is_empty() {
                location.clone()
            } else {
                location.join(&self.name)
            }
        })
    }

    pub fn left_full_path(&self) -> Option<PathBuf> {
        self.full_path(Side::Left)
    }

    pub fn right_full_path(&self) -> Option<PathBuf> {
        self.full_path(Side::Right)
    }
}

/*
 * Ordering used for the children of every directory: directories before
 * files, then case-insensitive by name. Names that only differ in case are
 * ordered by their exact text so the order is total.
 */
pub fn display_order(a: &Entry, b: &Entry) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str, kind: EntryKind) -> Entry {
        Entry::new(
            EntryId::ROOT,
            name.to_string(),
            kind,
            Some(PathBuf::from("/l")),
            Some(PathBuf::from("/r")),
            None,
        )
    }

    #[test]
    fn test_entry_new_defaults() {
        let e = entry("foo.txt", EntryKind::File);
        assert_eq!(e.status(), SyncStatus::Unset);
        assert!(e.children().is_empty());
        assert!(!e.is_dir());
        assert_eq!(e.left_full_path(), Some(PathBuf::from("/l/foo.txt")));
        assert_eq!(e.right_full_path(), Some(PathBuf::from("/r/foo.txt")));
    }

    #[test]
    fn test_root_full_path_is_location() {
        let root = entry("", EntryKind::Directory);
        assert_eq!(root.full_path(Side::Left), Some(PathBuf::from("/l")));
    }

    #[test]
    fn test_missing_location_has_no_full_path() {
        let mut e = entry("x", EntryKind::File);
        e.right_location = None;
        assert_eq!(e.right_full_path(), None);
        assert!(e.left_full_path().is_some());
    }

    #[test]
    fn test_display_order_dirs_first_then_case_insensitive() {
        let mut items = vec![
            entry("b.txt", EntryKind::File),
            entry("Zeta", EntryKind::Directory),
            entry("A.txt", EntryKind::File),
            entry("alpha", EntryKind::Directory),
        ];
        items.sort_by(display_order);
        let names: Vec<&str> = items.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn test_mirrored_swaps_sides() {
        assert_eq!(SyncStatus::LeftOnly.mirrored(), SyncStatus::RightOnly);
        assert_eq!(SyncStatus::UnknownRight.mirrored(), SyncStatus::UnknownLeft);
        assert_eq!(
            SyncStatus::RightOnlyUnknown.mirrored(),
            SyncStatus::LeftOnlyUnknown
        );
        assert_eq!(SyncStatus::Same.mirrored(), SyncStatus::Same);
        assert_eq!(SyncStatus::Differing.mirrored(), SyncStatus::Differing);
    }

    #[test]
    fn test_permits_copy() {
        assert!(SyncStatus::Differing.permits_copy(EntryKind::Directory, Side::Right));
        assert!(SyncStatus::LeftOnly.permits_copy(EntryKind::File, Side::Left));
        assert!(!SyncStatus::LeftOnly.permits_copy(EntryKind::File, Side::Right));
        assert!(!SyncStatus::Same.permits_copy(EntryKind::File, Side::Left));
        assert!(SyncStatus::UnknownRight.permits_copy(EntryKind::File, Side::Left));
        assert!(!SyncStatus::UnknownRight.permits_copy(EntryKind::Directory, Side::Left));
        assert!(!SyncStatus::LeftOnlyUnknown.permits_copy(EntryKind::File, Side::Left));
    }

    #[test]
    fn test_from_readability() {
        assert_eq!(SyncStatus::from_readability(true, true), None);
        assert_eq!(
            SyncStatus::from_readability(false, true),
            Some(SyncStatus::UnknownLeft)
        );
        assert_eq!(
            SyncStatus::from_readability(false, false),
            Some(SyncStatus::UnknownBoth)
        );
    }
}
