//! Row generation for classic and pairwise tables.
//!
//! Classic mode aligns slash-delimited per-column inputs by position, so one
//! multi-row paste can populate several columns in lockstep. Pairwise mode
//! expands the cartesian product of per-column option sets, hard-capped at
//! [`PAIRWISE_CAP`] combinations. Generated rows receive sequential values
//! in the table's identifier column when one is enabled.

use std::collections::BTreeMap;

use itertools::Itertools;
use itertools::structs::MultiProduct;
use thiserror::Error;
use uuid::Uuid;

use crate::{model::ProjectTable, validate};

/// Upper bound on pairwise combinations, a safety net against runaway input.
pub const PAIRWISE_CAP: usize = 2000;

/// Combinations produced per [`PairwiseJob::step`] call when driven by
/// [`PairwiseJob::run`].
pub const PAIRWISE_BATCH: usize = 250;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("{} segment(s) exceed {} characters", .segments.len(), validate::MAX_SEGMENT_LEN)]
    OverlongSegments { segments: Vec<String> },
}

/// Applies segment validation to every column input; generation must not
/// proceed while any segment is over length.
pub fn ensure_inputs_valid(inputs: &[(Uuid, String)]) -> Result<(), GenerateError> {
    let mut segments = Vec::new();
    for (_, raw) in inputs {
        segments.extend(validate::validate_segments(raw).invalid_segments);
    }
    if segments.is_empty() {
        Ok(())
    } else {
        Err(GenerateError::OverlongSegments { segments })
    }
}

/// First identifier for the next generated block: the maximum integer value
/// already present in the identifier column, plus one. Cells that do not
/// parse as integers are skipped, not treated as zero.
pub fn next_auto_id(table: &ProjectTable) -> i64 {
    let Some(column_id) = table.auto_id_column() else {
        return 1;
    };
    table
        .rows
        .iter()
        .filter_map(|row| row.value(column_id).trim().parse::<i64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// Overwrites the identifier cell of each value map with sequential numbers
/// in generation order. No-op when the table has no enabled identifier
/// column.
pub fn assign_auto_ids(table: &ProjectTable, values: &mut [BTreeMap<Uuid, String>]) {
    let Some(column_id) = table.auto_id_column() else {
        return;
    };
    let mut next = next_auto_id(table);
    for row in values {
        row.insert(column_id, next.to_string());
        next += 1;
    }
}

/// Classic generation: each input splits on `/` with parts trimmed but not
/// filtered, so an empty trailing part becomes an empty cell. Row *i* takes
/// part *i* from every column; the row count is the maximum part count. A
/// submission where every input is blank generates nothing.
pub fn classic_values(inputs: &[(Uuid, String)]) -> Vec<BTreeMap<Uuid, String>> {
    if inputs.iter().all(|(_, raw)| raw.trim().is_empty()) {
        return Vec::new();
    }
    let parts: Vec<(Uuid, Vec<String>)> = inputs
        .iter()
        .map(|(column_id, raw)| {
            let parts = raw.split('/').map(|p| p.trim().to_string()).collect();
            (*column_id, parts)
        })
        .collect();
    let height = parts.iter().map(|(_, p)| p.len()).max().unwrap_or(0);

    (0..height)
        .map(|index| {
            parts
                .iter()
                .map(|(column_id, p)| {
                    (*column_id, p.get(index).cloned().unwrap_or_default())
                })
                .collect()
        })
        .collect()
}

/// Option list for one pairwise column: split on `/`, trimmed, empties
/// filtered. A column with no usable options contributes a single empty
/// option so it does not annihilate the product.
pub fn pairwise_options(raw: &str) -> Vec<String> {
    let options: Vec<String> = raw
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if options.is_empty() {
        vec![String::new()]
    } else {
        options
    }
}

/// Cooperative pairwise expansion. Construction is cheap and produces no
/// combinations, so a caller can surface a "processing" state before driving
/// the product with [`step`](Self::step); dropping the job abandons it.
/// Combinations are emitted with the first column varying slowest and stop
/// at [`PAIRWISE_CAP`].
pub struct PairwiseJob {
    column_ids: Vec<Uuid>,
    product: MultiProduct<std::vec::IntoIter<String>>,
    emitted: usize,
    finished: bool,
}

impl PairwiseJob {
    pub fn new(inputs: &[(Uuid, String)]) -> Self {
        let column_ids: Vec<Uuid> = inputs.iter().map(|(column_id, _)| *column_id).collect();
        let product = inputs
            .iter()
            .map(|(_, raw)| pairwise_options(raw).into_iter())
            .multi_cartesian_product();
        Self {
            finished: column_ids.is_empty(),
            column_ids,
            product,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Produces up to `budget` further combinations. Returns an empty batch
    /// once the product is exhausted or the cap is reached.
    pub fn step(&mut self, budget: usize) -> Vec<BTreeMap<Uuid, String>> {
        let mut batch = Vec::new();
        while !self.finished && batch.len() < budget {
            if self.emitted >= PAIRWISE_CAP {
                self.finished = true;
                break;
            }
            match self.product.next() {
                Some(combination) => {
                    batch.push(
                        self.column_ids
                            .iter()
                            .copied()
                            .zip(combination)
                            .collect(),
                    );
                    self.emitted += 1;
                }
                None => self.finished = true,
            }
        }
        batch
    }

    /// Drives the job to completion in [`PAIRWISE_BATCH`]-sized steps.
    pub fn run(mut self) -> Vec<BTreeMap<Uuid, String>> {
        let mut rows = Vec::new();
        while !self.is_finished() {
            rows.extend(self.step(PAIRWISE_BATCH));
        }
        rows
    }
}
