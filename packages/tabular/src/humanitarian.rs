//! Humanitarian-response (5W) tables.

use std::path::Path;

use serde_json::Value;
use share2care_schema::cells::admin_code_from_value;
use share2care_schema::{LogicalField, candidates, probe_column};

use crate::{Table, TableError, read_table};

/// Name of the derived join-key column.
pub const ADMIN_CODE_COLUMN: &str = "admin_code";

/// A response table with a derived `admin_code` column.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTable {
    /// The normalized table, including [`ADMIN_CODE_COLUMN`].
    pub table: Table,
    /// Source column the admin code was derived from.
    pub code_column: String,
}

impl ResponseTable {
    /// Admin code of each row, `None` where the source cell was empty.
    pub fn admin_codes(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        let index = self.table.column_index(ADMIN_CODE_COLUMN);
        self.table
            .rows()
            .iter()
            .map(move |row| index.and_then(|i| row[i].as_str()))
    }
}

/// Loads a response table and derives its admin codes.
///
/// # Errors
///
/// Returns [`TableError::NotFound`] if the file is missing, a read error if
/// it cannot be parsed, or [`TableError::Schema`] if no admin-code column
/// exists.
pub fn load_response_table(path: &Path) -> Result<ResponseTable, TableError> {
    derive_admin_codes(read_table(path)?)
}

/// Adds the `admin_code` column by probing the admin-code candidates.
///
/// Codes are trimmed and upper-cased; empty cells become null.
///
/// # Errors
///
/// Returns [`TableError::Schema`] if no candidate column is present.
pub fn derive_admin_codes(mut table: Table) -> Result<ResponseTable, TableError> {
    let code_candidates = candidates(LogicalField::AdminCode);
    let code_column = probe_column(table.columns(), &code_candidates)?.to_string();
    log::debug!("Deriving admin codes from '{code_column}'");

    let codes: Vec<Value> = table
        .column_values(&code_column)
        .map(|values| {
            values
                .map(|v| admin_code_from_value(v).map_or(Value::Null, Value::String))
                .collect()
        })
        .unwrap_or_default();
    table.set_column(ADMIN_CODE_COLUMN, codes);

    Ok(ResponseTable { table, code_column })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_codes_from_first_candidate() {
        let mut table = Table::new(&["Admin1Pcode", "ADM2_PCODE", "Cluster"]);
        table.push_row(vec![json!("pk1"), json!(" pk101 "), json!("Food")]);
        table.push_row(vec![json!("pk1"), Value::Null, json!("WASH")]);

        let response = derive_admin_codes(table).unwrap();
        assert_eq!(response.code_column, "adm2_pcode");
        let codes: Vec<Option<&str>> = response.admin_codes().collect();
        assert_eq!(codes, vec![Some("PK101"), None]);
    }

    #[test]
    fn numeric_codes_render_without_fraction() {
        let mut table = Table::new(&["pcode"]);
        table.push_row(vec![json!(101.0)]);
        let response = derive_admin_codes(table).unwrap();
        assert_eq!(response.admin_codes().next(), Some(Some("101")));
    }

    #[test]
    fn missing_code_column_is_schema_error() {
        let table = Table::new(&["province", "cluster"]);
        let err = derive_admin_codes(table).unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
        assert!(err.to_string().contains("adm2_pcode"));
    }

    #[test]
    fn loads_csv_source() {
        let dir = std::env::temp_dir().join("share2care_humanitarian_csv");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("5w.csv");
        std::fs::write(&path, "Pcode,People_In_Need\nPK01,100\nPK02,50\n").unwrap();

        let response = load_response_table(&path).unwrap();
        assert_eq!(response.table.len(), 2);
        assert!(response.table.has_column("people_in_need"));
        assert!(response.table.has_column(ADMIN_CODE_COLUMN));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
