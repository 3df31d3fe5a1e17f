//! Expression registry - every decision expression referenced by any table
//!
//! Entries are keyed by their code (`text::escape_code`). The first sighting
//! fixes the display and definition text; later sightings only add tab and
//! table attributions, and differing text is kept as a conflict.

use crate::library::{DefinitionLookup, ExistingDefinition};
use crate::text;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, warn};

/// Where in a table an expression was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExpressionKind {
    Input,
    Output,
    Annotation,
}

/// One reference to an expression from a table
#[derive(Debug, Clone, Copy)]
pub struct Sighting<'a> {
    pub name: &'a str,
    pub definition: Option<&'a str>,
    pub kind: ExpressionKind,
    pub tab_id: &'a str,
    pub table_id: &'a str,
}

/// Text that disagreed with the canonical entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub tab_id: String,
    pub table_id: String,
    pub display: String,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionEntry {
    pub identifier: String,
    pub display: String,
    pub definition: Option<String>,
    pub kinds: IndexSet<ExpressionKind>,
    pub tabs: IndexSet<String>,
    pub tables: IndexSet<String>,
    pub conflicts: Vec<Conflict>,
    pub external_definitions: Vec<ExistingDefinition>,
}

impl ExpressionEntry {
    /// Definition text, or the display text when none was given
    pub fn pseudocode(&self) -> &str {
        self.definition.as_deref().unwrap_or(&self.display)
    }

    fn disagrees(&self, display: &str, definition: Option<&str>) -> bool {
        if self.display != display {
            return true;
        }
        matches!((self.definition.as_deref(), definition), (Some(a), Some(b)) if a != b)
    }
}

/// Result of registering a sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    Repeat,
    Conflict,
    /// Blank name, nothing registered
    Ignored,
    /// Registry already finalized
    Frozen,
}

#[derive(Debug, Default)]
pub struct ExpressionRegistry {
    entries: IndexMap<String, ExpressionEntry>,
    by_tab: IndexMap<String, IndexSet<String>>,
    by_table: IndexMap<String, IndexSet<String>>,
    tables_by_tab: IndexMap<String, IndexSet<String>>,
    finalized: bool,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sighting: Sighting<'_>) -> Registration {
        if self.finalized {
            warn!(name = sighting.name, "registry already finalized");
            return Registration::Frozen;
        }
        let display = sighting.name.trim();
        let identifier = text::escape_code(display);
        if identifier.is_empty() || text::is_dash(&identifier) {
            return Registration::Ignored;
        }
        let definition = sighting
            .definition
            .map(str::trim)
            .filter(|d| !d.is_empty());

        self.by_tab
            .entry(sighting.tab_id.to_string())
            .or_default()
            .insert(identifier.clone());
        self.by_table
            .entry(sighting.table_id.to_string())
            .or_default()
            .insert(identifier.clone());
        self.tables_by_tab
            .entry(sighting.tab_id.to_string())
            .or_default()
            .insert(sighting.table_id.to_string());

        let Some(entry) = self.entries.get_mut(&identifier) else {
            debug!(identifier = %identifier, "new expression");
            self.entries.insert(
                identifier.clone(),
                ExpressionEntry {
                    identifier,
                    display: display.to_string(),
                    definition: definition.map(str::to_string),
                    kinds: IndexSet::from([sighting.kind]),
                    tabs: IndexSet::from([sighting.tab_id.to_string()]),
                    tables: IndexSet::from([sighting.table_id.to_string()]),
                    conflicts: Vec::new(),
                    external_definitions: Vec::new(),
                },
            );
            return Registration::New;
        };

        entry.kinds.insert(sighting.kind);
        entry.tabs.insert(sighting.tab_id.to_string());
        entry.tables.insert(sighting.table_id.to_string());

        if entry.disagrees(display, definition) {
            let known = entry.conflicts.iter().any(|c| {
                c.display == display && c.definition.as_deref() == definition
            });
            if known {
                return Registration::Repeat;
            }
            warn!(
                identifier = %entry.identifier,
                table = sighting.table_id,
                tab = sighting.tab_id,
                canonical = entry.pseudocode(),
                found = definition.unwrap_or(sighting.name.trim()),
                "expression has a non-matching repeated definition"
            );
            entry.conflicts.push(Conflict {
                tab_id: sighting.tab_id.to_string(),
                table_id: sighting.table_id.to_string(),
                display: display.to_string(),
                definition: definition.map(str::to_string),
            });
            return Registration::Conflict;
        }

        if entry.definition.is_none() {
            entry.definition = definition.map(str::to_string);
        }
        Registration::Repeat
    }

    /// Attach existing hand-written definitions and freeze the registry
    pub fn finalize(&mut self, lookup: &dyn DefinitionLookup) {
        if self.finalized {
            return;
        }
        for entry in self.entries.values_mut() {
            entry.external_definitions = lookup.lookup(&entry.identifier);
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn get(&self, identifier: &str) -> Option<&ExpressionEntry> {
        self.entries.get(identifier)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ExpressionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn conflict_count(&self) -> usize {
        self.entries.values().map(|e| e.conflicts.len()).sum()
    }

    /// Tab ids in first-seen order
    pub fn tabs(&self) -> impl Iterator<Item = &str> {
        self.by_tab.keys().map(String::as_str)
    }

    /// Table ids attributed to a tab, in first-seen order
    pub fn tables_for_tab(&self, tab_id: &str) -> Vec<&str> {
        self.tables_by_tab
            .get(tab_id)
            .map(|tables| tables.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn identifiers_for_tab(&self, tab_id: &str) -> Vec<&ExpressionEntry> {
        self.collect(self.by_tab.get(tab_id))
    }

    pub fn identifiers_for_table(&self, table_id: &str) -> Vec<&ExpressionEntry> {
        self.collect(self.by_table.get(table_id))
    }

    /// Entries seen with a given kind, e.g. every output
    pub fn entries_of_kind(&self, kind: ExpressionKind) -> Vec<&ExpressionEntry> {
        self.entries.values().filter(|e| e.kinds.contains(&kind)).collect()
    }

    fn collect(&self, ids: Option<&IndexSet<String>>) -> Vec<&ExpressionEntry> {
        ids.map(|ids| ids.iter().filter_map(|id| self.entries.get(id)).collect())
            .unwrap_or_default()
    }
}
