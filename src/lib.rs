//! tabledeck: an embeddable engine for hierarchical collections of tabular
//! records.
//!
//! Folders own tables, tables own columns and rows. The engine covers the
//! canonical data model, bulk row generation for classic (positional) and
//! pairwise (bounded cartesian) tables, import/export reconciliation against
//! an existing schema, and the derived view pipeline (search → filter →
//! paginate → aggregate) consumed by a rendering shell. Persistence goes
//! through an injected key-value [`storage::Storage`] port: the full
//! collection snapshot is read once at startup and written through after
//! every mutation.

pub mod codec;
pub mod export;
pub mod generate;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod text;
pub mod validate;
pub mod view;

use std::{env, sync::OnceLock};

use log::LevelFilter;

static LOGGER: OnceLock<()> = OnceLock::new();

/// Opt-in logging setup for embedding shells and tests. Safe to call more
/// than once.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabledeck", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}
