#![allow(dead_code)]

use tabledeck::model::TableKind;
use tabledeck::session::Session;
use tabledeck::storage::MemoryStorage;
use uuid::Uuid;

/// Builds a session with one folder and one selected table of the given
/// mode.
pub fn session_with_table(kind: TableKind, with_auto_id: bool) -> (Session, Uuid) {
    let mut session = Session::new(Box::new(MemoryStorage::new()));
    let folder_id = session.create_folder("workspace", "integration fixture");
    let table_id = session
        .create_table(folder_id, "cases", kind, with_auto_id)
        .expect("table created");
    assert!(session.select_table(table_id));
    (session, table_id)
}

/// Adds a column to the active table and returns its id.
pub fn add_column(session: &mut Session, label: &str) -> Uuid {
    session.add_column(label).expect("column added")
}
