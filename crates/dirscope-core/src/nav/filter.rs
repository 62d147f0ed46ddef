//! Sorting and filtering of a listing into the rendered projection.

use std::cmp::Ordering;

use crate::fs::entry::Entry;

/// The field by which entries are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Directories before everything else, then by name.
    TypeName,
    /// Alphabetically by name (case-insensitive).
    Name,
    /// By size; entries without a known size sort first.
    Size,
    /// By last-modified time.
    Modified,
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Field and direction together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: SortField::TypeName,
            direction: SortDirection::Ascending,
        }
    }
}

const CYCLE: [SortField; 4] = [
    SortField::TypeName,
    SortField::Name,
    SortField::Size,
    SortField::Modified,
];

impl SortKey {
    /// Parses `type_name`, `name`, `size` or `modified`, with an optional
    /// `_desc` suffix.
    pub fn parse(s: &str) -> Option<Self> {
        let (field, direction) = match s.strip_suffix("_desc") {
            Some(base) => (base, SortDirection::Descending),
            None => (s, SortDirection::Ascending),
        };
        let field = match field {
            "type_name" => SortField::TypeName,
            "name" => SortField::Name,
            "size" => SortField::Size,
            "modified" => SortField::Modified,
            _ => return None,
        };
        Some(Self { field, direction })
    }

    /// Next key in the cycle: each field ascending, then descending.
    pub fn next(self) -> Self {
        match self.direction {
            SortDirection::Ascending => Self {
                direction: SortDirection::Descending,
                ..self
            },
            SortDirection::Descending => {
                let idx = CYCLE.iter().position(|f| *f == self.field).unwrap_or(0);
                Self {
                    field: CYCLE[(idx + 1) % CYCLE.len()],
                    direction: SortDirection::Ascending,
                }
            }
        }
    }

    pub fn label(self) -> String {
        let field = match self.field {
            SortField::TypeName => "type",
            SortField::Name => "name",
            SortField::Size => "size",
            SortField::Modified => "modified",
        };
        let arrow = match self.direction {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        };
        format!("{field}{arrow}")
    }
}

/// Returns a **new** vector holding the visible entries in display order.
///
/// Hidden entries are dropped unless `show_hidden`; a non-empty `query`
/// keeps only names containing it, case-insensitively.
pub fn project(entries: &[Entry], show_hidden: bool, query: &str, key: SortKey) -> Vec<Entry> {
    let needle = query.to_lowercase();
    let mut visible: Vec<Entry> = entries
        .iter()
        .filter(|e| show_hidden || !e.is_hidden())
        .filter(|e| needle.is_empty() || e.display_name().to_lowercase().contains(&needle))
        .cloned()
        .collect();

    visible.sort_by(|a, b| {
        let ord = compare_by_field(a, b, key.field);
        match key.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    visible
}

fn compare_by_field(a: &Entry, b: &Entry, field: SortField) -> Ordering {
    let by_name = || {
        a.display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase())
            .then_with(|| a.name().cmp(b.name()))
    };
    match field {
        SortField::TypeName => b.is_dir().cmp(&a.is_dir()).then_with(by_name),
        SortField::Name => by_name(),
        SortField::Size => a.size().bytes().cmp(&b.size().bytes()).then_with(by_name),
        SortField::Modified => a.modified().cmp(&b.modified()).then_with(by_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::entry::{EntryKind, EntrySize};
    use std::ffi::OsStr;

    fn file(name: &str, size: u64) -> Entry {
        Entry::new(name, EntryKind::File, EntrySize::Known(size))
    }

    fn dir(name: &str, size: EntrySize) -> Entry {
        Entry::new(name, EntryKind::Directory, size)
    }

    fn names(entries: &[Entry]) -> Vec<&OsStr> {
        entries.iter().map(|e| e.name()).collect()
    }

    fn sample() -> Vec<Entry> {
        vec![
            file("x", 10),
            file("Y", 20),
            dir("b", EntrySize::Known(5)),
            file(".hidden", 1),
            dir("a", EntrySize::Pending),
        ]
    }

    #[test]
    fn type_name_puts_directories_first() {
        let out = project(&sample(), false, "", SortKey::default());
        assert_eq!(names(&out), vec!["a", "b", "x", "Y"]);
    }

    #[test]
    fn hidden_entries_are_opt_in() {
        let out = project(&sample(), true, "", SortKey::default());
        assert!(names(&out).contains(&OsStr::new(".hidden")));
    }

    #[test]
    fn size_sort_puts_unknown_first() {
        let key = SortKey::parse("size").unwrap();
        let out = project(&sample(), false, "", key);
        assert_eq!(names(&out), vec!["a", "b", "x", "Y"]);

        let key = SortKey::parse("size_desc").unwrap();
        let out = project(&sample(), false, "", key);
        assert_eq!(names(&out), vec!["Y", "x", "b", "a"]);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let out = project(&sample(), false, "y", SortKey::default());
        assert_eq!(names(&out), vec!["Y"]);
        assert!(project(&sample(), false, "zzz", SortKey::default()).is_empty());
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        assert_eq!(SortKey::parse("colour"), None);
        assert_eq!(
            SortKey::parse("modified_desc"),
            Some(SortKey {
                field: SortField::Modified,
                direction: SortDirection::Descending
            })
        );
    }

    #[test]
    fn cycle_visits_every_key_and_wraps() {
        let start = SortKey::default();
        let mut key = start;
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(key);
            key = key.next();
        }
        assert_eq!(key, start);
        assert_eq!(seen.len(), 8);
        assert_eq!(seen[1].direction, SortDirection::Descending);
        assert_eq!(seen[2].field, SortField::Name);
    }

    #[test]
    fn project_does_not_mutate_input() {
        let entries = sample();
        let _ = project(&entries, true, "", SortKey::parse("name_desc").unwrap());
        assert_eq!(entries[0].name(), "x");
    }
}
