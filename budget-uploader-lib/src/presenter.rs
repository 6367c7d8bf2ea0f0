use std::collections::{BTreeMap, HashMap};

use comfy_table::Table;
use serde::Serialize;

use crate::{filter::FilterState, memory::CategoryMemory, transaction::Transaction};


/// Visible transaction with the category shown for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    /// Position in the transaction store
    pub index: usize,
    pub transaction: Transaction,
    /// Selected category, empty when uncategorized
    pub category: String,
}

/// Counts over the visible rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub visible: usize,
    pub categorized: usize,
    pub uncategorized: usize,
}

/// What the user sees: the filtered rows and one category per visible description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedView {
    pub rows: Vec<Row>,
    pub categories: BTreeMap<String, String>,
}

impl CategorizedView {
    /// Selected category of a visible description
    pub fn get(&self, description: &str) -> Option<&str> {
        self.categories.get(description).map(String::as_str)
    }

    /// Optimistically show a new category on every row of a description
    pub fn select(&mut self, description: &str, category: &str) {
        if let Some(selected) = self.categories.get_mut(description) {
            *selected = category.into();
            self.rows
                .iter_mut()
                .filter(|r| r.transaction.description == description)
                .for_each(|r| r.category = category.into());
        }
    }

    /// Render the rows as a text table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["date", "description", "category"]);
        for row in &self.rows {
            table.add_row(vec![
                row.transaction
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                row.transaction.description.clone(),
                row.category.clone(),
            ]);
        }
        table
    }

    pub fn summary(&self) -> Summary {
        let categorized = self.rows.iter().filter(|r| !r.category.is_empty()).count();
        Summary {
            visible: self.rows.len(),
            categorized,
            uncategorized: self.rows.len() - categorized,
        }
    }
}

/// Category edit made by the user
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEdit {
    category: String,
    /// Sequence of the save issued for this edit
    sequence: u64,
}

/// Category edits made by the user that no confirmed save covers yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEdits {
    edits: HashMap<String, PendingEdit>,
}

impl PendingEdits {
    /// Record an edit, replacing any older edit of the description
    pub fn insert(&mut self, description: &str, category: &str, sequence: u64) {
        self.edits.insert(
            description.into(),
            PendingEdit {
                category: category.into(),
                sequence,
            },
        );
    }

    pub fn get(&self, description: &str) -> Option<&str> {
        self.edits.get(description).map(|e| e.category.as_str())
    }

    /// Drop the edits confirmed by a save at least as new as the edit
    ///
    /// An edit is kept while memory only holds a snapshot value or an older save, even an equal
    /// one.
    pub fn resolve(&mut self, memory: &CategoryMemory) {
        self.edits.retain(|description, edit| {
            memory
                .committed_sequence(description)
                .map_or(true, |committed| committed < edit.sequence)
        });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Build the view of the filtered transactions
///
/// A pending edit wins over memory, memory may not have caught up with it yet.
pub fn present(
    transactions: &[Transaction],
    filter: &FilterState,
    memory: &CategoryMemory,
    pending: &PendingEdits,
) -> CategorizedView {
    let mut categories = BTreeMap::new();
    let rows = filter
        .apply(transactions)
        .into_iter()
        .map(|(index, transaction)| {
            let description = transaction.description.as_str();
            let category = pending
                .get(description)
                .unwrap_or_else(|| memory.get(description))
                .to_string();
            categories.insert(description.to_string(), category.clone());
            Row {
                index,
                transaction: transaction.clone(),
                category,
            }
        })
        .collect();
    CategorizedView { rows, categories }
}
