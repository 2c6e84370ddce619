#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Severity scoring from humanitarian-response tables.
//!
//! One rule is chosen per dataset, in precedence order: an explicit
//! `severity` column, an `ipc_phase` column, a people-in-need style column
//! scaled to 0-5 by its maximum, or a constant 1.0. Scores are then
//! deduplicated by admin code, keeping the first row.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use share2care_geography_models::{AdminActivityCount, SeverityRecord};
use share2care_schema::cells::cell_as_f64;
use share2care_schema::{LogicalField, candidates, find_column};
use share2care_tabular::humanitarian::{ResponseTable, derive_admin_codes, load_response_table};
use share2care_tabular::{Table, TableError};
use thiserror::Error;

/// Column holding explicit severity scores.
pub const SEVERITY_COLUMN: &str = "severity";

/// Column holding IPC phases.
pub const IPC_PHASE_COLUMN: &str = "ipc_phase";

/// Upper end of the severity scale.
pub const MAX_SEVERITY: f64 = 5.0;

/// Score assigned when no scoring column exists.
pub const CONSTANT_SEVERITY: f64 = 1.0;

/// Errors that can occur while deriving severity.
#[derive(Debug, Error)]
pub enum SeverityError {
    /// The response table could not be loaded or has no admin-code column.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Rule used to score a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SeverityRule {
    /// Explicit `severity` column, used as-is.
    Severity,
    /// `ipc_phase` column, used as-is.
    IpcPhase,
    /// People-in-need style column scaled by its maximum.
    PeopleInNeed {
        /// Source column.
        column: String,
    },
    /// Constant score for every region.
    Constant,
}

impl fmt::Display for SeverityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Severity => write!(f, "explicit '{SEVERITY_COLUMN}' column"),
            Self::IpcPhase => write!(f, "'{IPC_PHASE_COLUMN}' column"),
            Self::PeopleInNeed { column } => {
                write!(f, "'{column}' scaled to 0-{MAX_SEVERITY}")
            }
            Self::Constant => write!(f, "constant {CONSTANT_SEVERITY}"),
        }
    }
}

/// Severity scores for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityTable {
    /// Rule that produced the scores.
    pub rule: SeverityRule,
    /// One record per admin code, in first-seen order.
    pub records: Vec<SeverityRecord>,
}

/// Chooses the scoring rule for a table.
#[must_use]
pub fn select_rule(table: &Table) -> SeverityRule {
    if table.has_column(SEVERITY_COLUMN) {
        return SeverityRule::Severity;
    }
    if table.has_column(IPC_PHASE_COLUMN) {
        return SeverityRule::IpcPhase;
    }
    let pin_candidates = candidates(LogicalField::PeopleInNeed);
    find_column(table.columns(), &pin_candidates).map_or(SeverityRule::Constant, |column| {
        SeverityRule::PeopleInNeed {
            column: column.to_string(),
        }
    })
}

#[allow(clippy::float_cmp)]
fn row_scores(table: &Table, rule: &SeverityRule) -> Vec<Option<f64>> {
    let column_scores = |column: &str| -> Vec<Option<f64>> {
        table
            .column_values(column)
            .map(|values| values.map(cell_as_f64).collect())
            .unwrap_or_else(|| vec![None; table.len()])
    };

    match rule {
        SeverityRule::Severity => column_scores(SEVERITY_COLUMN),
        SeverityRule::IpcPhase => column_scores(IPC_PHASE_COLUMN),
        SeverityRule::PeopleInNeed { column } => {
            let raw = column_scores(column);
            let max = raw
                .iter()
                .flatten()
                .copied()
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
            let divisor = match max {
                Some(m) if m != 0.0 => m,
                _ => 1.0,
            };
            raw.into_iter()
                .map(|v| v.map(|v| v / divisor * MAX_SEVERITY))
                .collect()
        }
        SeverityRule::Constant => vec![Some(CONSTANT_SEVERITY); table.len()],
    }
}

/// Scores every admin code of a response table.
///
/// Rows without an admin code are skipped. When several rows share a code
/// the first one wins.
#[must_use]
pub fn derive_severity(response: &ResponseTable) -> SeverityTable {
    let rule = select_rule(&response.table);
    log::info!("Severity rule: {rule}");

    let scores = row_scores(&response.table, &rule);
    let mut seen = BTreeSet::new();
    let mut skipped = 0usize;

    let records: Vec<SeverityRecord> = response
        .admin_codes()
        .zip(scores)
        .filter_map(|(code, severity_score)| {
            let Some(code) = code else {
                skipped += 1;
                return None;
            };
            seen.insert(code.to_string()).then(|| SeverityRecord {
                admin_code: code.to_string(),
                severity_score,
            })
        })
        .collect();

    if skipped > 0 {
        log::warn!("Skipped {skipped} rows without an admin code");
    }
    log::info!("Derived severity for {} admin codes", records.len());

    SeverityTable { rule, records }
}

/// Derives admin codes on a raw table, then scores it.
///
/// # Errors
///
/// Returns [`SeverityError::Table`] if no admin-code column exists.
pub fn severity_from_table(table: Table) -> Result<SeverityTable, SeverityError> {
    Ok(derive_severity(&derive_admin_codes(table)?))
}

/// Loads a response table from disk and scores it.
///
/// # Errors
///
/// Returns [`SeverityError::Table`] if the file is missing, unreadable or
/// has no admin-code column.
pub fn load_severity(path: &Path) -> Result<SeverityTable, SeverityError> {
    Ok(derive_severity(&load_response_table(path)?))
}

/// Counts response rows per admin code, in first-seen order.
#[must_use]
pub fn count_by_admin(response: &ResponseTable) -> Vec<AdminActivityCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for code in response.admin_codes().flatten() {
        let count = counts.entry(code.to_string()).or_insert_with(|| {
            order.push(code.to_string());
            0
        });
        *count += 1;
    }

    order
        .into_iter()
        .map(|admin_code| AdminActivityCount {
            activity_count: counts.get(&admin_code).copied().unwrap_or(0),
            admin_code,
        })
        .collect()
}
