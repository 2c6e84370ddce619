//! Price-monitoring tables.
//!
//! Resolves the date, price, commodity and market columns by candidate
//! probing and produces observations sorted ascending by date. Rows with an
//! unparseable date or a missing price are discarded.

use std::collections::BTreeSet;
use std::path::Path;

use share2care_forecast_models::PriceObservation;
use share2care_schema::cells::{cell_as_f64, cell_as_text};
use share2care_schema::{ColumnNotFound, LogicalField, candidates, probe_column};

use crate::dates::parse_date;
use crate::{Table, TableError, read_table};

/// Source columns resolved for each logical price field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceColumns {
    /// Date column.
    pub date: String,
    /// Price column.
    pub price: String,
    /// Commodity column.
    pub commodity: String,
    /// Market column.
    pub market: String,
}

/// Resolves the price columns of a normalized schema.
///
/// # Errors
///
/// Returns [`ColumnNotFound`] for the first field with no matching column.
pub fn resolve_price_columns<S: AsRef<str>>(schema: &[S]) -> Result<PriceColumns, ColumnNotFound> {
    let resolve = |field| probe_column(schema, &candidates(field)).map(ToString::to_string);
    Ok(PriceColumns {
        date: resolve(LogicalField::Date)?,
        price: resolve(LogicalField::Price)?,
        commodity: resolve(LogicalField::Commodity)?,
        market: resolve(LogicalField::Market)?,
    })
}

/// Price observations loaded from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    /// Retained observations, ascending by date.
    pub observations: Vec<PriceObservation>,
    /// Rows dropped for an unparseable date or missing price.
    pub discarded: usize,
}

impl PriceTable {
    /// Distinct commodities in first-seen order.
    #[must_use]
    pub fn commodities(&self) -> Vec<String> {
        distinct(self.observations.iter().map(|o| o.commodity.as_str()))
    }

    /// Distinct markets in first-seen order.
    #[must_use]
    pub fn markets(&self) -> Vec<String> {
        distinct(self.observations.iter().map(|o| o.market.as_str()))
    }

    /// Number of retained observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether no observation was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(ToString::to_string)
        .collect()
}

/// Converts a normalized table into price observations.
///
/// # Errors
///
/// Returns [`TableError::Schema`] if a price field cannot be resolved.
pub fn price_table_from(table: &Table) -> Result<PriceTable, TableError> {
    let columns = resolve_price_columns(table.columns())?;
    log::debug!(
        "Price columns: date='{}' price='{}' commodity='{}' market='{}'",
        columns.date,
        columns.price,
        columns.commodity,
        columns.market
    );

    let text = |row: usize, column: &str| {
        table
            .cell(row, column)
            .and_then(cell_as_text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let mut observations = Vec::with_capacity(table.len());
    let mut discarded = 0;

    for row in 0..table.len() {
        let date = table.cell(row, &columns.date).and_then(parse_date);
        let price = table.cell(row, &columns.price).and_then(cell_as_f64);

        let (Some(date), Some(price)) = (date, price) else {
            discarded += 1;
            continue;
        };

        observations.push(PriceObservation {
            date,
            commodity: text(row, &columns.commodity),
            market: text(row, &columns.market),
            price,
        });
    }

    observations.sort_by_key(|o| o.date);

    if discarded > 0 {
        log::warn!("Discarded {discarded} price rows with invalid date or missing price");
    }

    Ok(PriceTable {
        observations,
        discarded,
    })
}

/// Loads a price-monitoring file.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be read or a price field
/// cannot be resolved.
pub fn load_price_table(path: &Path) -> Result<PriceTable, TableError> {
    let prices = price_table_from(&read_table(path)?)?;
    log::info!(
        "{}: {} price observations ({} commodities, {} markets)",
        path.display(),
        prices.len(),
        prices.commodities().len(),
        prices.markets().len()
    );
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn table(rows: Vec<Vec<Value>>) -> Table {
        let mut table = Table::new(&["Date", "Admin1", "Market", "Commodity", "Price"]);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    #[test]
    fn resolves_alternate_column_names() {
        let columns =
            resolve_price_columns(&["month", "avg_price", "item", "city", "unit"]).unwrap();
        assert_eq!(columns.date, "month");
        assert_eq!(columns.price, "avg_price");
        assert_eq!(columns.commodity, "item");
        assert_eq!(columns.market, "city");
    }

    #[test]
    fn missing_price_column_is_error() {
        let err = resolve_price_columns(&["date", "commodity", "market"]).unwrap_err();
        assert_eq!(err.field, "price");
    }

    #[test]
    fn drops_invalid_rows_and_sorts_stably() {
        let prices = price_table_from(&table(vec![
            vec![json!("2024-02-01"), json!("Punjab"), json!("Lahore"), json!("Wheat"), json!("120")],
            vec![json!("bad"), json!("Punjab"), json!("Lahore"), json!("Wheat"), json!("1")],
            vec![json!("2024-01-01"), json!("Sindh"), json!("Karachi"), json!("Rice"), json!("1,250.5")],
            vec![json!("2024-01-01"), json!("Punjab"), json!("Lahore"), json!("Wheat"), Value::Null],
            vec![json!("2024-01-01"), json!("Punjab"), json!("Lahore"), json!("Wheat"), json!(100)],
        ]))
        .unwrap();

        assert_eq!(prices.discarded, 2);
        assert_eq!(prices.len(), 3);
        assert_eq!(prices.observations[0].commodity, "Rice");
        assert!((prices.observations[0].price - 1250.5).abs() < f64::EPSILON);
        assert_eq!(prices.observations[1].commodity, "Wheat");
        assert_eq!(
            prices.observations[2].date,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn lists_distinct_commodities_and_markets() {
        let prices = price_table_from(&table(vec![
            vec![json!("2024-01-01"), Value::Null, json!("Lahore"), json!("Wheat"), json!(1)],
            vec![json!("2024-01-02"), Value::Null, json!("Quetta"), json!("Rice"), json!(1)],
            vec![json!("2024-01-03"), Value::Null, json!("Lahore"), json!("Wheat"), json!(1)],
        ]))
        .unwrap();
        assert_eq!(prices.commodities(), vec!["Wheat", "Rice"]);
        assert_eq!(prices.markets(), vec!["Lahore", "Quetta"]);
    }

    #[test]
    fn loads_wfp_style_csv() {
        let dir = std::env::temp_dir().join("share2care_prices_csv");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wfp_food_prices_pak.csv");
        std::fs::write(
            &path,
            "date,admin1,market,commodity,unit,price\n\
             #date,#adm1+name,#loc+market+name,#item+name,#item+unit,#value\n\
             2024-01-15,Punjab,Lahore,Wheat flour,KG,120\n\
             2023-12-15,Punjab,Lahore,Wheat flour,KG,115\n",
        )
        .unwrap();

        let prices = load_price_table(&path).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices.discarded, 0);
        assert_eq!(
            prices.observations[0].date,
            NaiveDate::from_ymd_opt(2023, 12, 15).unwrap()
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
