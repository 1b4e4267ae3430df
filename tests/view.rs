//! Derived pipeline through the session: filter cycling, pagination,
//! global statistics, sidebar visibility, and search coalescing.

mod common;

use common::{add_column, session_with_table};
use tabledeck::model::TableKind;
use tabledeck::view::PAGE_SIZE;

#[test]
fn filter_toggle_cycles_include_exclude_absent() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "status");
    session
        .generate_rows(&[(column, "open/closed/open".into())])
        .expect("generate");

    // include: only matching rows survive
    session.toggle_filter(column, "open");
    let view = session.refresh().expect("derived view");
    assert_eq!(view.filtered.len(), 2);

    // exclude: matching rows disappear
    session.toggle_filter(column, "open");
    let view = session.refresh().expect("derived view");
    assert_eq!(view.filtered.len(), 1);

    // absent: everything is back
    session.toggle_filter(column, "open");
    let view = session.refresh().expect("derived view");
    assert_eq!(view.filtered.len(), 3);
    assert!(session.view().filters.is_empty());
}

#[test]
fn statistics_are_global_regardless_of_filters_and_page() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "c");
    session
        .generate_rows(&[(column, "a/a/b//".into())])
        .expect("generate");

    session.toggle_filter(column, "a");
    session.set_search("a");
    let view = session.refresh().expect("derived view");

    let stats = &view.stats[&column];
    assert_eq!(stats.empty_count, 2);
    assert_eq!(stats.counts.values().sum::<usize>(), 3);
    assert_eq!(stats.counts["a"], 2);
    assert_eq!(stats.counts["b"], 1);
}

#[test]
fn pagination_slices_the_filtered_set() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "n");
    let input = (0..120)
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/");
    session
        .generate_rows(&[(column, input)])
        .expect("generate");

    let view = session.refresh().expect("derived view");
    assert_eq!(view.slice.page_count, 3);
    assert_eq!(view.slice.end - view.slice.start, PAGE_SIZE);

    session.set_page(99);
    let view = session.refresh().expect("derived view");
    assert_eq!(view.slice.page, 2);
    assert_eq!(view.slice.end, 120);
}

#[test]
fn sidebar_search_filters_columns_and_auto_expands_value_matches() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let browser = add_column(&mut session, "Browser");
    let os = add_column(&mut session, "OS");
    session
        .generate_rows(&[(browser, "Firefox/Chrome".into()), (os, "Linux/Mac".into())])
        .expect("generate");

    session.set_sidebar_search("fire");
    let view = session.refresh().expect("derived view");
    assert_eq!(view.visible_columns, vec![browser]);
    // Value match expands the column; later searches never collapse it.
    assert!(session.view().expanded.contains(&browser));

    session.set_sidebar_search("linux");
    let view = session.refresh().expect("derived view");
    assert_eq!(view.visible_columns, vec![os]);
    assert!(session.view().expanded.contains(&browser));
    assert!(session.view().expanded.contains(&os));
}

#[test]
fn search_applies_on_refresh_and_converges_to_latest() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "c");
    session
        .generate_rows(&[(column, "alpha/beta/gamma".into())])
        .expect("generate");

    session.set_search("al");
    session.set_search("be");
    session.set_search("gam");
    let view = session.refresh().expect("derived view");
    // Intermediate keystrokes were coalesced; only the latest applies.
    assert_eq!(view.filtered.len(), 1);
    let table = session.active_table().expect("active table");
    assert_eq!(table.rows[view.filtered[0]].value(column), "gamma");
}
