//! Application-state container and the single mutation choke point.
//!
//! The session owns the canonical folder collection, the transient view
//! state, and an injected storage port. Every mutation of the collection
//! flows through [`Session::mutate_active_table`] (or the folder-level
//! equivalent): the transform runs against a copy, the touched table and its
//! owning folder are stamped, the collection is replaced wholesale, and the
//! full snapshot is written through to storage. Storage failures degrade to
//! warnings; a missing active folder or table turns the mutation into a
//! no-op.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::{
    export,
    generate::{self, GenerateError, PairwiseJob},
    model::{Column, DynamicRow, Folder, ProjectTable, TableKind, stamp},
    reconcile::{self, ImportError, ImportPayload, ImportSummary},
    storage::{COLLECTION_KEY, SIDEBAR_KEY, Storage},
    view::{self, DerivedView, StatsCache, ViewState},
};

pub struct Session {
    storage: Box<dyn Storage>,
    folders: Vec<Folder>,
    active_folder_id: Option<Uuid>,
    active_table_id: Option<Uuid>,
    view: ViewState,
    sidebar_collapsed: bool,
    stats_cache: StatsCache,
}

impl Session {
    /// Builds a session from the storage port. A failed or corrupt read
    /// yields an empty collection; the engine never refuses to start over
    /// storage trouble.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        let folders: Vec<Folder> = match storage.get(COLLECTION_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(folders) => folders,
                Err(err) => {
                    warn!("Stored collection is corrupt, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read stored collection, starting empty: {err:#}");
                Vec::new()
            }
        };
        let sidebar_collapsed = match storage.get(SIDEBAR_KEY) {
            Ok(Some(text)) => text.trim().parse().unwrap_or(false),
            Ok(None) => false,
            Err(err) => {
                warn!("Failed to read sidebar preference: {err:#}");
                false
            }
        };
        info!("Session loaded with {} folder(s)", folders.len());
        Self {
            storage,
            folders,
            active_folder_id: None,
            active_table_id: None,
            view: ViewState::default(),
            sidebar_collapsed,
            stats_cache: StatsCache::default(),
        }
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn folder(&self, folder_id: Uuid) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    pub fn active_table(&self) -> Option<&ProjectTable> {
        let folder = self.folder(self.active_folder_id?)?;
        folder.table(self.active_table_id?)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select_folder(&mut self, folder_id: Uuid) -> bool {
        if self.folder(folder_id).is_none() {
            return false;
        }
        self.active_folder_id = Some(folder_id);
        self.active_table_id = None;
        self.view = ViewState::default();
        true
    }

    /// Selects a table (and its owning folder). Transient view state is
    /// scoped to one table, so it resets here.
    pub fn select_table(&mut self, table_id: Uuid) -> bool {
        let Some(folder_index) = self.owning_folder_index(table_id) else {
            return false;
        };
        self.active_folder_id = Some(self.folders[folder_index].id);
        self.active_table_id = Some(table_id);
        self.view = ViewState::default();
        true
    }

    // ------------------------------------------------------------------
    // Mutation choke points
    // ------------------------------------------------------------------

    /// Applies a transform to the active table. The collection is replaced
    /// with a copy in which only the touched table and its owning folder
    /// differ, both freshly stamped, and the snapshot is written through.
    /// Stale or missing active references make this a no-op.
    pub fn mutate_active_table<F>(&mut self, transform: F) -> bool
    where
        F: FnOnce(&mut ProjectTable),
    {
        let (Some(folder_id), Some(table_id)) = (self.active_folder_id, self.active_table_id)
        else {
            debug!("No active table; mutation skipped");
            return false;
        };
        let Some(folder_index) = self.folders.iter().position(|f| f.id == folder_id) else {
            debug!("Active folder no longer exists; mutation skipped");
            return false;
        };
        let Some(table_index) = self.folders[folder_index]
            .tables
            .iter()
            .position(|t| t.id == table_id)
        else {
            debug!("Active table no longer exists; mutation skipped");
            return false;
        };

        let mut table = self.folders[folder_index].tables[table_index].clone();
        transform(&mut table);
        table.updated_at = stamp(table.updated_at);

        let mut folder = self.folders[folder_index].clone();
        folder.updated_at = stamp(folder.updated_at);
        folder.tables[table_index] = table;

        let mut folders = self.folders.clone();
        folders[folder_index] = folder;
        self.folders = folders;
        self.persist_collection();
        true
    }

    fn with_folder<F>(&mut self, folder_id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut Folder),
    {
        let Some(index) = self.folders.iter().position(|f| f.id == folder_id) else {
            return false;
        };
        let mut folder = self.folders[index].clone();
        apply(&mut folder);
        folder.updated_at = stamp(folder.updated_at);

        let mut folders = self.folders.clone();
        folders[index] = folder;
        self.folders = folders;
        self.persist_collection();
        true
    }

    fn persist_collection(&mut self) {
        match serde_json::to_string(&self.folders) {
            Ok(snapshot) => {
                if let Err(err) = self.storage.set(COLLECTION_KEY, &snapshot) {
                    warn!("Failed to persist collection snapshot: {err:#}");
                }
            }
            Err(err) => warn!("Failed to serialize collection snapshot: {err}"),
        }
    }

    fn owning_folder_index(&self, table_id: Uuid) -> Option<usize> {
        self.folders
            .iter()
            .position(|f| f.tables.iter().any(|t| t.id == table_id))
    }

    // ------------------------------------------------------------------
    // Folder operations
    // ------------------------------------------------------------------

    pub fn create_folder(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Uuid {
        let folder = Folder::new(name, description);
        let id = folder.id;
        info!("Created folder '{}'", folder.name);
        self.folders.push(folder);
        self.persist_collection();
        id
    }

    pub fn rename_folder(&mut self, folder_id: Uuid, name: impl Into<String>) -> bool {
        let name = name.into();
        self.with_folder(folder_id, |folder| folder.name = name)
    }

    pub fn set_folder_description(
        &mut self,
        folder_id: Uuid,
        description: impl Into<String>,
    ) -> bool {
        let description = description.into();
        self.with_folder(folder_id, |folder| folder.description = description)
    }

    /// Deletes a folder and every table it owns.
    pub fn delete_folder(&mut self, folder_id: Uuid) -> bool {
        let before = self.folders.len();
        let folders: Vec<Folder> = self
            .folders
            .iter()
            .filter(|f| f.id != folder_id)
            .cloned()
            .collect();
        if folders.len() == before {
            return false;
        }
        if self.active_folder_id == Some(folder_id) {
            self.active_folder_id = None;
            self.active_table_id = None;
            self.view = ViewState::default();
        }
        self.folders = folders;
        self.persist_collection();
        true
    }

    // ------------------------------------------------------------------
    // Table operations
    // ------------------------------------------------------------------

    /// Creates a table in a folder. The table's mode and its identifier
    /// column wiring are fixed at creation.
    pub fn create_table(
        &mut self,
        folder_id: Uuid,
        name: impl Into<String>,
        kind: TableKind,
        with_auto_id: bool,
    ) -> Option<Uuid> {
        let table = ProjectTable::new(name, kind, with_auto_id);
        let table_id = table.id;
        info!("Created table '{}'", table.name);
        self.with_folder(folder_id, |folder| folder.tables.push(table))
            .then_some(table_id)
    }

    pub fn rename_table(&mut self, table_id: Uuid, name: impl Into<String>) -> bool {
        let Some(folder_index) = self.owning_folder_index(table_id) else {
            return false;
        };
        let folder_id = self.folders[folder_index].id;
        let name = name.into();
        self.with_folder(folder_id, |folder| {
            if let Some(table) = folder.tables.iter_mut().find(|t| t.id == table_id) {
                table.name = name;
                table.updated_at = stamp(table.updated_at);
            }
        })
    }

    pub fn delete_table(&mut self, table_id: Uuid) -> bool {
        let Some(folder_index) = self.owning_folder_index(table_id) else {
            return false;
        };
        let folder_id = self.folders[folder_index].id;
        let removed = self.with_folder(folder_id, |folder| {
            folder.tables.retain(|t| t.id != table_id);
        });
        if removed && self.active_table_id == Some(table_id) {
            self.active_table_id = None;
            self.view = ViewState::default();
        }
        removed
    }

    // ------------------------------------------------------------------
    // Column operations (active table)
    // ------------------------------------------------------------------

    pub fn add_column(&mut self, label: impl Into<String>) -> Option<Uuid> {
        let column = Column::new(label);
        let column_id = column.id;
        self.mutate_active_table(|table| table.columns.push(column))
            .then_some(column_id)
    }

    pub fn rename_column(&mut self, column_id: Uuid, label: impl Into<String>) -> bool {
        let label = label.into();
        let mut renamed = false;
        self.mutate_active_table(|table| {
            if let Some(column) = table.column_mut(column_id) {
                column.label = label;
                renamed = true;
            }
        }) && renamed
    }

    pub fn remove_column(&mut self, column_id: Uuid) -> bool {
        let mut removed = false;
        self.mutate_active_table(|table| removed = table.remove_column(column_id)) && removed
    }

    // ------------------------------------------------------------------
    // Row operations (active table)
    // ------------------------------------------------------------------

    /// Edits one cell. The identifier column is system-managed and refuses
    /// edits.
    pub fn set_cell(&mut self, row_id: Uuid, column_id: Uuid, value: impl Into<String>) -> bool {
        if let Some(table) = self.active_table()
            && table.auto_id_column() == Some(column_id)
        {
            debug!("Identifier column is system-managed; edit ignored");
            return false;
        }
        let value = value.into();
        let mut edited = false;
        self.mutate_active_table(|table| {
            if let Some(row) = table.row_mut(row_id) {
                row.set_value(column_id, value);
                edited = true;
            }
        }) && edited
    }

    pub fn set_row_comment(&mut self, row_id: Uuid, comment: Option<String>) -> bool {
        let mut edited = false;
        self.mutate_active_table(|table| {
            if let Some(row) = table.row_mut(row_id) {
                row.comment = comment;
                row.updated_at = stamp(row.updated_at);
                edited = true;
            }
        }) && edited
    }

    pub fn remove_row(&mut self, row_id: Uuid) -> bool {
        let mut removed = false;
        self.mutate_active_table(|table| {
            let before = table.rows.len();
            table.rows.retain(|r| r.id != row_id);
            removed = table.rows.len() != before;
        }) && removed
    }

    pub fn clear_rows(&mut self) -> bool {
        self.mutate_active_table(|table| table.rows.clear())
    }

    /// Manually creates one empty row, prepended and given the next
    /// identifier when the table numbers its rows.
    pub fn create_row(&mut self) -> Option<Uuid> {
        let mut row_id = None;
        self.mutate_active_table(|table| {
            let mut values = vec![BTreeMap::new()];
            generate::assign_auto_ids(table, &mut values);
            let row = DynamicRow::new(values.pop().unwrap_or_default());
            row_id = Some(row.id);
            table.rows.insert(0, row);
        });
        row_id
    }

    // ------------------------------------------------------------------
    // Row generation
    // ------------------------------------------------------------------

    /// Generates rows from per-column inputs according to the active
    /// table's mode and prepends them. Over-length segments block the whole
    /// submission. Returns the number of generated rows; zero when there is
    /// no active table.
    pub fn generate_rows(&mut self, inputs: &[(Uuid, String)]) -> Result<usize, GenerateError> {
        generate::ensure_inputs_valid(inputs)?;
        let Some(table) = self.active_table() else {
            debug!("No active table; generation skipped");
            return Ok(0);
        };
        let values = match table.kind {
            TableKind::Classic => generate::classic_values(inputs),
            TableKind::Pairwise => PairwiseJob::new(inputs).run(),
        };
        if values.is_empty() {
            return Ok(0);
        }
        let count = values.len();
        self.mutate_active_table(|table| {
            let mut values = values;
            generate::assign_auto_ids(table, &mut values);
            let rows: Vec<DynamicRow> = values.into_iter().map(DynamicRow::new).collect();
            table.rows.splice(0..0, rows);
        });
        info!("Generated {count} row(s)");
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    /// Imports a JSON document into the active table. Classification and
    /// validation run before any mutation, so failure never leaves a
    /// partial merge.
    pub fn import_json(&mut self, text: &str) -> Result<ImportSummary, ImportError> {
        let payload = reconcile::classify_json(text)?;
        Ok(self.apply_import(payload))
    }

    /// Imports delimited text into the active table, first row as headers.
    pub fn import_delimited(&mut self, text: &str) -> Result<ImportSummary, ImportError> {
        let payload = reconcile::classify_delimited(text)?;
        Ok(self.apply_import(payload))
    }

    fn apply_import(&mut self, payload: ImportPayload) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mutated = self.mutate_active_table(|table| {
            summary = reconcile::apply(table, payload);
        });
        if mutated {
            info!(
                "Imported {} row(s), {} new column(s)",
                summary.rows_added, summary.columns_added
            );
        }
        summary
    }

    pub fn export_delimited(&self) -> anyhow::Result<Option<String>> {
        match self.active_table() {
            Some(table) => Ok(Some(export::to_delimited(table)?)),
            None => Ok(None),
        }
    }

    pub fn export_json(&self) -> anyhow::Result<Option<String>> {
        match self.active_table() {
            Some(table) => Ok(Some(export::to_json(table)?)),
            None => Ok(None),
        }
    }

    pub fn export_filename(&self, extension: &str) -> Option<String> {
        self.active_table()
            .map(|table| export::export_filename(&table.name, extension))
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    /// Records the latest search text; applied on the next [`refresh`].
    ///
    /// [`refresh`]: Session::refresh
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.view.search.submit(text);
    }

    pub fn set_sidebar_search(&mut self, text: impl Into<String>) {
        self.view.sidebar_search = text.into();
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.page = page;
    }

    pub fn toggle_filter(&mut self, column_id: Uuid, value: &str) {
        view::toggle_filter(&mut self.view.filters, column_id, value);
    }

    pub fn toggle_expanded(&mut self, column_id: Uuid) {
        if !self.view.expanded.remove(&column_id) {
            self.view.expanded.insert(column_id);
        }
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) {
        self.sidebar_collapsed = collapsed;
        let value = if collapsed { "true" } else { "false" };
        if let Err(err) = self.storage.set(SIDEBAR_KEY, value) {
            warn!("Failed to persist sidebar preference: {err:#}");
        }
    }

    /// Settles the coalesced search input, merges auto-expanded columns,
    /// and recomputes the derived view for the active table.
    pub fn refresh(&mut self) -> Option<DerivedView> {
        self.view.search.settle();
        let folder_id = self.active_folder_id?;
        let table_id = self.active_table_id?;
        let folder = self.folders.iter().find(|f| f.id == folder_id)?;
        let table = folder.table(table_id)?;

        let stats = self.stats_cache.stats_for(table).clone();
        view::auto_expand(table, &stats, &self.view.sidebar_search, &mut self.view.expanded);
        let filtered = view::filter_rows(table, self.view.search.applied(), &self.view.filters);
        let slice = view::paginate(filtered.len(), self.view.page, view::PAGE_SIZE);
        let visible_columns = view::visible_columns(table, &stats, &self.view.sidebar_search);
        Some(DerivedView {
            filtered,
            slice,
            stats,
            visible_columns,
        })
    }
}
