use std::collections::BTreeSet;

use uuid::Uuid;

/// Rendered state of the select-all checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCheckbox {
    pub checked: bool,
    pub indeterminate: bool,
}

impl HeaderCheckbox {
    /// Indeterminate takes precedence over checked, as with HTML checkboxes.
    pub fn glyph(&self) -> &'static str {
        if self.indeterminate {
            "[-]"
        } else if self.checked {
            "[x]"
        } else {
            "[ ]"
        }
    }
}

pub fn row_glyph(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

/// UUIDs of the rows picked for a bulk action.
///
/// Entries may refer to rows that are no longer loaded; selection survives
/// page and search changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<Uuid>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row(&mut self, uuid: Uuid, checked: bool) {
        if checked {
            self.selected.insert(uuid);
        } else {
            self.selected.remove(&uuid);
        }
    }

    /// Flip one row and return its new state
    pub fn toggle_row(&mut self, uuid: Uuid) -> bool {
        let checked = !self.selected.contains(&uuid);
        self.set_row(uuid, checked);
        checked
    }

    /// Header click: clear when anything is selected, otherwise select all loaded rows.
    ///
    /// A partial selection therefore collapses to nothing rather than growing to all.
    pub fn toggle_all(&mut self, loaded: &[Uuid]) {
        if self.selected.is_empty() {
            self.selected = loaded.iter().copied().collect();
        } else {
            self.selected.clear();
        }
    }

    /// Header checkbox state against the rows currently loaded.
    ///
    /// `None` means no page has loaded yet, which always reads as indeterminate.
    pub fn header_state(&self, loaded: Option<&[Uuid]>) -> HeaderCheckbox {
        match loaded {
            None => HeaderCheckbox {
                checked: false,
                indeterminate: true,
            },
            Some(loaded) => HeaderCheckbox {
                checked: !self.selected.is_empty()
                    && self.selected.len() == loaded.len()
                    && loaded.iter().all(|uuid| self.selected.contains(uuid)),
                indeterminate: self.selected.len() != loaded.len(),
            },
        }
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.selected.contains(uuid)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
