//! Import reconciliation through the session: shape classification, column
//! dedup, ordering, and failure atomicity.

mod common;

use common::{add_column, session_with_table};
use tabledeck::model::TableKind;
use tabledeck::reconcile::ImportError;

#[test]
fn generic_import_reuses_columns_by_normalized_label() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    add_column(&mut session, "Name");

    let summary = session
        .import_json(r#"[{"name": "ada"}, {" NAME ": "grace"}]"#)
        .expect("import");
    assert_eq!(summary.rows_added, 2);
    assert_eq!(summary.columns_added, 0);

    let table = session.active_table().expect("active table");
    assert_eq!(table.columns.len(), 1);
    let column = table.columns[0].id;
    assert_eq!(table.rows[0].value(column), "ada");
    assert_eq!(table.rows[1].value(column), "grace");
}

#[test]
fn imported_rows_append_while_generated_rows_prepend() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "value");

    session
        .generate_rows(&[(column, "seed".into())])
        .expect("generate");
    session
        .import_json(r#"[{"value": "imported"}]"#)
        .expect("import");
    session
        .generate_rows(&[(column, "fresh".into())])
        .expect("generate");

    let table = session.active_table().expect("active table");
    let values: Vec<&str> = table.rows.iter().map(|r| r.value(column)).collect();
    assert_eq!(values, vec!["fresh", "seed", "imported"]);
}

#[test]
fn data_wrapped_payloads_expand_their_first_array_field() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let summary = session
        .import_json(r#"{"data": [{"os": "linux", "browser": ["firefox", "chrome"]}]}"#)
        .expect("import");
    assert_eq!(summary.rows_added, 2);
    assert_eq!(summary.columns_added, 2);

    let table = session.active_table().expect("active table");
    let os = table.column_by_label("os").expect("os column").id;
    let browser = table.column_by_label("browser").expect("browser column").id;
    assert_eq!(table.rows[0].value(os), "linux");
    assert_eq!(table.rows[0].value(browser), "firefox");
    assert_eq!(table.rows[1].value(os), "linux");
    assert_eq!(table.rows[1].value(browser), "chrome");
}

#[test]
fn delimited_import_merges_against_existing_schema() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    add_column(&mut session, "name");

    let summary = session
        .import_delimited("Name,Age\nada,36\ngrace,45")
        .expect("import");
    assert_eq!(summary.rows_added, 2);
    assert_eq!(summary.columns_added, 1);
}

#[test]
fn native_import_assigns_fresh_row_ids_and_sequential_identifiers() {
    let (mut session, _) = session_with_table(TableKind::Classic, true);
    let auto = session
        .active_table()
        .and_then(|t| t.auto_id_column())
        .expect("identifier column");

    session.create_row().expect("manual row");
    let manual_id = session.active_table().expect("active table").rows[0].id;

    let text = format!(
        r#"{{
            "columns": [{{"id": "{auto}", "label": "ID"}}],
            "rows": [{{"id": "{manual_id}", "values": {{"{auto}": "777"}}}}]
        }}"#
    );
    let summary = session.import_json(&text).expect("import");
    assert_eq!(summary.rows_added, 1);

    let table = session.active_table().expect("active table");
    assert_eq!(table.rows.len(), 2);
    // Imported row is appended, re-identified, and renumbered after the
    // existing maximum regardless of the value it carried.
    assert_ne!(table.rows[1].id, manual_id);
    assert_eq!(table.rows[0].value(auto), "1");
    assert_eq!(table.rows[1].value(auto), "2");
}

#[test]
fn failed_imports_never_merge_partially() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    add_column(&mut session, "name");
    let before = session.active_table().expect("active table").clone();

    assert!(matches!(
        session.import_json("{not json"),
        Err(ImportError::Json(_))
    ));
    assert!(matches!(session.import_json("[]"), Err(ImportError::Empty)));
    assert!(matches!(
        session.import_json(r#"{"columns": [], "rows": []}"#),
        Err(ImportError::NoColumns)
    ));

    let after = session.active_table().expect("active table");
    assert_eq!(after.columns.len(), before.columns.len());
    assert!(after.rows.is_empty());
    assert_eq!(after.updated_at, before.updated_at);
}

#[test]
fn exported_json_reimports_into_an_empty_table() {
    let (mut session, _) = session_with_table(TableKind::Classic, false);
    let column = add_column(&mut session, "value");
    session
        .generate_rows(&[(column, "a/b".into())])
        .expect("generate");
    let document = session
        .export_json()
        .expect("export")
        .expect("active table");

    let (mut other, _) = session_with_table(TableKind::Classic, false);
    let summary = other.import_json(&document).expect("import");
    assert_eq!(summary.rows_added, 2);
    assert_eq!(summary.columns_added, 1);

    let table = other.active_table().expect("active table");
    assert_eq!(table.rows[0].value(column), "a");
    assert_eq!(table.rows[1].value(column), "b");
}
