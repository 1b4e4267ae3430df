//! Derived view pipeline: search and filters over the canonical rows, the
//! pagination slice, per-column value statistics, and the sidebar's visible
//! column subset.
//!
//! Everything here is a pure recomputation from the canonical table plus
//! transient UI state. Statistics are global over all rows of the table,
//! independent of the active search, filters, and page.

use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use crate::model::{ActiveFilter, DynamicRow, FilterMode, ProjectTable};

/// Fixed page length for the row grid.
pub const PAGE_SIZE: usize = 50;

/// Search input decoupled from the keystroke stream. `submit` records the
/// latest typed value; `settle` folds it into the applied value the row
/// filter actually reads. Intermediate submissions may be coalesced, but the
/// applied value always converges to the latest one once submissions pause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescedInput {
    latest: String,
    applied: String,
}

impl CoalescedInput {
    pub fn submit(&mut self, text: impl Into<String>) {
        self.latest = text.into();
    }

    /// Applies the latest submission; returns whether the applied value
    /// changed.
    pub fn settle(&mut self) -> bool {
        if self.latest == self.applied {
            return false;
        }
        self.applied = self.latest.clone();
        true
    }

    pub fn latest(&self) -> &str {
        &self.latest
    }

    pub fn applied(&self) -> &str {
        &self.applied
    }
}

/// Transient UI state scoped to the table currently in view.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub search: CoalescedInput,
    pub filters: Vec<ActiveFilter>,
    pub page: usize,
    pub sidebar_search: String,
    pub expanded: HashSet<Uuid>,
}

/// Cycles the filter on one (column, value) pair:
/// absent → include → exclude → absent. At most one filter exists per pair.
pub fn toggle_filter(filters: &mut Vec<ActiveFilter>, column_id: Uuid, value: &str) {
    match filters
        .iter()
        .position(|f| f.column_id == column_id && f.value == value)
    {
        Some(index) => match filters[index].mode {
            FilterMode::Include => filters[index].mode = FilterMode::Exclude,
            FilterMode::Exclude => {
                filters.remove(index);
            }
        },
        None => filters.push(ActiveFilter {
            column_id,
            value: value.to_string(),
            mode: FilterMode::Include,
        }),
    }
}

/// A row passes when some cell contains the search text (case-insensitive
/// substring; empty search passes everything) and every active filter is
/// satisfied. Include requires exact cell equality, exclude inequality; a
/// missing cell compares as the empty string, so a filter on `""` selects
/// empty cells.
pub fn row_matches(row: &DynamicRow, search: &str, filters: &[ActiveFilter]) -> bool {
    if !search.is_empty() {
        let needle = search.to_lowercase();
        let hit = row
            .values
            .values()
            .any(|cell| cell.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    filters.iter().all(|filter| {
        let cell = row.value(filter.column_id);
        match filter.mode {
            FilterMode::Include => cell == filter.value,
            FilterMode::Exclude => cell != filter.value,
        }
    })
}

/// Indices of rows surviving search and filters, in table order.
pub fn filter_rows(table: &ProjectTable, search: &str, filters: &[ActiveFilter]) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row_matches(row, search, filters))
        .map(|(index, _)| index)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub start: usize,
    pub end: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Contiguous sub-range of a filtered set. The requested page is clamped
/// into range when the filtered set shrinks underneath it.
pub fn paginate(total: usize, requested_page: usize, page_size: usize) -> PageSlice {
    let page_count = total.div_ceil(page_size);
    let page = requested_page.min(page_count.saturating_sub(1));
    let start = page * page_size;
    let end = (start + page_size).min(total);
    PageSlice {
        start,
        end,
        page,
        page_count,
    }
}

/// Frequency of each distinct non-empty value in one column, plus the count
/// of rows where the cell is empty or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnStats {
    pub counts: BTreeMap<String, usize>,
    pub empty_count: usize,
}

/// Value statistics for every column, across all rows of the table.
pub fn column_stats(table: &ProjectTable) -> HashMap<Uuid, ColumnStats> {
    let mut stats: HashMap<Uuid, ColumnStats> = table
        .columns
        .iter()
        .map(|column| (column.id, ColumnStats::default()))
        .collect();
    for row in &table.rows {
        for column in &table.columns {
            let entry = stats.get_mut(&column.id).expect("column entry");
            let cell = row.value(column.id);
            if cell.is_empty() {
                entry.empty_count += 1;
            } else {
                *entry.counts.entry(cell.to_string()).or_insert(0) += 1;
            }
        }
    }
    stats
}

/// Columns visible in the sidebar: all of them when there is no sidebar
/// search, otherwise those whose label or any distinct value contains the
/// search text (case-insensitive).
pub fn visible_columns(
    table: &ProjectTable,
    stats: &HashMap<Uuid, ColumnStats>,
    sidebar_search: &str,
) -> Vec<Uuid> {
    if sidebar_search.is_empty() {
        return table.columns.iter().map(|c| c.id).collect();
    }
    let needle = sidebar_search.to_lowercase();
    table
        .columns
        .iter()
        .filter(|column| {
            if column.label.to_lowercase().contains(&needle) {
                return true;
            }
            stats
                .get(&column.id)
                .is_some_and(|s| s.counts.keys().any(|v| v.to_lowercase().contains(&needle)))
        })
        .map(|column| column.id)
        .collect()
}

/// Marks columns whose values (not labels) match the sidebar search as
/// expanded. One-way merge: previously expanded columns stay expanded.
pub fn auto_expand(
    table: &ProjectTable,
    stats: &HashMap<Uuid, ColumnStats>,
    sidebar_search: &str,
    expanded: &mut HashSet<Uuid>,
) {
    if sidebar_search.is_empty() {
        return;
    }
    let needle = sidebar_search.to_lowercase();
    for column in &table.columns {
        let hit = stats
            .get(&column.id)
            .is_some_and(|s| s.counts.keys().any(|v| v.to_lowercase().contains(&needle)));
        if hit {
            expanded.insert(column.id);
        }
    }
}

/// The recomputed read model handed to the rendering layer.
#[derive(Debug, Clone)]
pub struct DerivedView {
    /// Indices into the table's row list, post search and filters.
    pub filtered: Vec<usize>,
    pub slice: PageSlice,
    pub stats: HashMap<Uuid, ColumnStats>,
    pub visible_columns: Vec<Uuid>,
}

/// Full pipeline run in dependency order. Pure; reads the applied (settled)
/// search value only.
pub fn derive(table: &ProjectTable, view: &ViewState) -> DerivedView {
    let filtered = filter_rows(table, view.search.applied(), &view.filters);
    let slice = paginate(filtered.len(), view.page, PAGE_SIZE);
    let stats = column_stats(table);
    let visible_columns = visible_columns(table, &stats, &view.sidebar_search);
    DerivedView {
        filtered,
        slice,
        stats,
        visible_columns,
    }
}

/// Memoized statistics keyed by `(table id, updated_at)`. Timestamps
/// strictly increase per mutation, so a matching key proves the rows and
/// columns are unchanged.
#[derive(Debug, Default)]
pub struct StatsCache {
    key: Option<(Uuid, i64)>,
    stats: HashMap<Uuid, ColumnStats>,
}

impl StatsCache {
    pub fn stats_for(&mut self, table: &ProjectTable) -> &HashMap<Uuid, ColumnStats> {
        let key = (table.id, table.updated_at);
        if self.key != Some(key) {
            self.stats = column_stats(table);
            self.key = Some(key);
        }
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, TableKind};
    use std::collections::BTreeMap as Values;

    fn table_with(rows: &[&[(&str, &str)]]) -> (ProjectTable, HashMap<String, Uuid>) {
        let mut table = ProjectTable::new("t", TableKind::Classic, false);
        let mut ids = HashMap::new();
        for row in rows {
            for (label, _) in row.iter() {
                if !ids.contains_key(*label) {
                    let column = Column::new(*label);
                    ids.insert(label.to_string(), column.id);
                    table.columns.push(column);
                }
            }
        }
        for row in rows {
            let mut values = Values::new();
            for (label, value) in row.iter() {
                values.insert(ids[*label], value.to_string());
            }
            table.rows.push(DynamicRow::new(values));
        }
        (table, ids)
    }

    #[test]
    fn filter_toggle_cycles_through_modes() {
        let mut filters = Vec::new();
        let column = Uuid::new_v4();
        toggle_filter(&mut filters, column, "x");
        assert_eq!(filters[0].mode, FilterMode::Include);
        toggle_filter(&mut filters, column, "x");
        assert_eq!(filters[0].mode, FilterMode::Exclude);
        toggle_filter(&mut filters, column, "x");
        assert!(filters.is_empty());
    }

    #[test]
    fn search_matches_any_cell_case_insensitively() {
        let (table, _) = table_with(&[
            &[("name", "Ada"), ("lang", "math")],
            &[("name", "Grace"), ("lang", "COBOL")],
        ]);
        assert_eq!(filter_rows(&table, "cobol", &[]), vec![1]);
        assert_eq!(filter_rows(&table, "", &[]), vec![0, 1]);
        assert!(filter_rows(&table, "fortran", &[]).is_empty());
    }

    #[test]
    fn include_filter_requires_exact_equality() {
        let (table, ids) = table_with(&[
            &[("status", "open")],
            &[("status", "closed")],
            &[("status", "")],
        ]);
        let column = ids["status"];
        let include = vec![ActiveFilter {
            column_id: column,
            value: "open".into(),
            mode: FilterMode::Include,
        }];
        assert_eq!(filter_rows(&table, "", &include), vec![0]);

        let exclude = vec![ActiveFilter {
            column_id: column,
            value: "open".into(),
            mode: FilterMode::Exclude,
        }];
        assert_eq!(filter_rows(&table, "", &exclude), vec![1, 2]);

        // The empty value selects rows whose cell is empty or absent.
        let empties = vec![ActiveFilter {
            column_id: column,
            value: String::new(),
            mode: FilterMode::Include,
        }];
        assert_eq!(filter_rows(&table, "", &empties), vec![2]);
    }

    #[test]
    fn paginate_clamps_page_into_range() {
        let slice = paginate(120, 0, 50);
        assert_eq!((slice.start, slice.end, slice.page_count), (0, 50, 3));
        let slice = paginate(120, 9, 50);
        assert_eq!((slice.page, slice.start, slice.end), (2, 100, 120));
        let slice = paginate(0, 3, 50);
        assert_eq!((slice.page, slice.start, slice.end, slice.page_count), (0, 0, 0, 0));
    }

    #[test]
    fn stats_count_distinct_values_and_empties() {
        let (table, ids) = table_with(&[
            &[("c", "a")],
            &[("c", "a")],
            &[("c", "b")],
            &[("c", "")],
            &[("c", "")],
        ]);
        let stats = column_stats(&table);
        let column = &stats[&ids["c"]];
        assert_eq!(column.empty_count, 2);
        assert_eq!(column.counts.values().sum::<usize>(), 3);
        assert_eq!(column.counts["a"], 2);
        assert_eq!(column.counts["b"], 1);
    }

    #[test]
    fn sidebar_matches_labels_and_values() {
        let (table, ids) = table_with(&[&[("Browser", "Firefox"), ("OS", "Linux")]]);
        let stats = column_stats(&table);
        assert_eq!(
            visible_columns(&table, &stats, "brow"),
            vec![ids["Browser"]]
        );
        assert_eq!(visible_columns(&table, &stats, "linux"), vec![ids["OS"]]);
        assert_eq!(visible_columns(&table, &stats, "").len(), 2);
    }

    #[test]
    fn auto_expand_matches_values_only_and_never_collapses() {
        let (table, ids) = table_with(&[&[("Browser", "Firefox"), ("OS", "Linux")]]);
        let stats = column_stats(&table);
        let mut expanded = HashSet::new();
        expanded.insert(ids["OS"]);

        // "browser" matches only the label, so nothing new expands.
        auto_expand(&table, &stats, "browser", &mut expanded);
        assert!(!expanded.contains(&ids["Browser"]));

        auto_expand(&table, &stats, "fire", &mut expanded);
        assert!(expanded.contains(&ids["Browser"]));
        // Previously expanded columns stay expanded.
        assert!(expanded.contains(&ids["OS"]));
    }

    #[test]
    fn coalesced_input_converges_to_latest_submission() {
        let mut input = CoalescedInput::default();
        input.submit("a");
        input.submit("ab");
        input.submit("abc");
        assert_eq!(input.applied(), "");
        assert!(input.settle());
        assert_eq!(input.applied(), "abc");
        assert!(!input.settle());
    }

    #[test]
    fn stats_cache_recomputes_only_on_new_stamp() {
        let (mut table, ids) = table_with(&[&[("c", "a")]]);
        let mut cache = StatsCache::default();
        assert_eq!(cache.stats_for(&table)[&ids["c"]].counts["a"], 1);

        // Same stamp: cached result even though rows changed behind its back.
        let mut values = Values::new();
        values.insert(ids["c"], "a".to_string());
        table.rows.push(DynamicRow::new(values));
        assert_eq!(cache.stats_for(&table)[&ids["c"]].counts["a"], 1);

        table.updated_at = crate::model::stamp(table.updated_at);
        assert_eq!(cache.stats_for(&table)[&ids["c"]].counts["a"], 2);
    }
}
