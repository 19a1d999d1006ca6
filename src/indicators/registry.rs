use once_cell::sync::Lazy;
use serde::Serialize;

use crate::models::{ColumnLayout, FieldKind, FieldSpec, Schema};
use crate::scrape::TableSelector;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    EconomicCalendar, // release history of a macro print
    Commodities,
    Currencies,
}

/// Order in which the source table lists its rows. Documented per indicator,
/// never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowOrder {
    NewestFirst,
    OldestFirst,
}

// ============================================================================
// INDICATOR SPEC
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSpec {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Optional sub-folder under `raw/`
    pub family: Option<String>,
    /// File name of the CSV object
    pub output_name: String,
    pub source_url: String,
    pub table: TableSelector,
    pub layout: ColumnLayout,
    pub row_order: RowOrder,
}

impl IndicatorSpec {
    pub fn schema(&self) -> Schema {
        self.layout.schema()
    }

    /// `raw/<family>/<name>.csv`, or `raw/<name>.csv` without a family.
    pub fn destination_key(&self) -> String {
        match &self.family {
            Some(family) => format!("raw/{}/{}", family, self.output_name),
            None => format!("raw/{}", self.output_name),
        }
    }
}

// ============================================================================
// LAYOUTS
// ============================================================================

macro_rules! field {
    ($name:expr, $cell:expr, $kind:ident) => {
        FieldSpec { name: $name, cell: $cell, kind: FieldKind::$kind }
    };
}

/// Release history row: date, actual, forecast, previous, plus trailing cells.
/// "previous" is published as `close`.
pub fn calendar_layout() -> ColumnLayout {
    ColumnLayout {
        expected_cells: 5,
        fields: vec![
            field!("date", 0, Date),
            field!("actual_state", 1, Text),
            field!("close", 3, Text),
            field!("forecast", 2, Text),
        ],
    }
}

/// Historical data row: date, last, open, high, low, volume.
pub fn ohlcv_layout() -> ColumnLayout {
    ColumnLayout {
        expected_cells: 6,
        fields: vec![
            field!("date", 0, Date),
            field!("close", 1, Number),
            field!("open", 2, Number),
            field!("high", 3, Number),
            field!("low", 4, Number),
            field!("volume", 5, Number),
        ],
    }
}

// Helper macro to reduce boilerplate
macro_rules! ind {
    ($id:expr, $name:expr, $cat:expr, $family:expr, $file:expr, $url:expr, $table:expr, $layout:expr) => {
        IndicatorSpec {
            id: $id.to_string(),
            name: $name.to_string(),
            category: $cat,
            family: $family.map(|s: &str| s.to_string()),
            output_name: $file.to_string(),
            source_url: $url.to_string(),
            table: $table,
            layout: $layout,
            row_order: RowOrder::NewestFirst,
        }
    };
}

// ============================================================================
// STATIC INDICATOR REGISTRY
// ============================================================================

static INDICATORS: Lazy<Vec<IndicatorSpec>> = Lazy::new(|| {
    vec![
        // Calendar table: no header row to skip, rows hang directly off the table
        ind!("caixin_services_index", "Caixin Services PMI (China)", Category::EconomicCalendar,
             None::<&str>, "caixin_index.csv",
             "https://br.investing.com/economic-calendar/chinese-caixin-services-pmi-596",
             TableSelector::by_id("economicCalendarData").direct_rows(),
             calendar_layout()),
        // Historical data tables: first row is the header
        ind!("bloomberg_commodity_index", "Bloomberg Commodity Index", Category::Commodities,
             None::<&str>, "bloomberg_commodity_index.csv",
             "https://br.investing.com/indices/bloomberg-commodity-historical-data",
             TableSelector::by_id("curr_table").skip(1),
             ohlcv_layout()),
        ind!("usd_cny", "USD/CNY", Category::Currencies,
             None::<&str>, "usd_cny.csv",
             "https://br.investing.com/currencies/usd-cny-historical-data",
             TableSelector::by_id("curr_table").skip(1),
             ohlcv_layout()),
    ]
});

pub struct Registry;

impl Registry {
    pub fn all() -> &'static [IndicatorSpec] {
        &INDICATORS
    }

    pub fn get(id: &str) -> Option<&'static IndicatorSpec> {
        INDICATORS.iter().find(|spec| spec.id == id)
    }

    /// Resolves ids in the order given, each at most once; unknown ids are
    /// returned separately.
    pub fn select<'a>(ids: &'a [String]) -> (Vec<&'static IndicatorSpec>, Vec<&'a str>) {
        let mut found: Vec<&'static IndicatorSpec> = Vec::new();
        let mut unknown = Vec::new();
        for id in ids {
            match Self::get(id) {
                Some(spec) if found.iter().any(|f| f.id == spec.id) => {}
                Some(spec) => found.push(spec),
                None => unknown.push(id.as_str()),
            }
        }
        (found, unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_keys() {
        let keys: Vec<_> = Registry::all().iter().map(|s| s.destination_key()).collect();
        assert_eq!(
            keys,
            vec!["raw/caixin_index.csv", "raw/bloomberg_commodity_index.csv", "raw/usd_cny.csv"]
        );
    }

    #[test]
    fn test_family_nests_key() {
        let mut spec = Registry::get("caixin_services_index").unwrap().clone();
        spec.family = Some("caixin".into());
        assert_eq!(spec.destination_key(), "raw/caixin/caixin_index.csv");
    }

    #[test]
    fn test_output_schemas() {
        let caixin = Registry::get("caixin_services_index").unwrap();
        assert_eq!(caixin.schema().fields(), ["date", "actual_state", "close", "forecast"]);

        for id in ["bloomberg_commodity_index", "usd_cny"] {
            let spec = Registry::get(id).unwrap();
            assert_eq!(spec.schema().fields(), ["date", "close", "open", "high", "low", "volume"]);
        }
    }

    #[test]
    fn test_layout_cells_within_row() {
        for spec in Registry::all() {
            assert!(spec.layout.fields.iter().all(|f| f.cell < spec.layout.expected_cells), "{}", spec.id);
        }
    }

    #[test]
    fn test_select_reports_unknown_ids() {
        let ids = vec!["usd_cny".to_string(), "sp500".to_string()];
        let (found, unknown) = Registry::select(&ids);
        assert_eq!(found.len(), 1);
        assert_eq!(unknown, vec!["sp500"]);
    }

    #[test]
    fn test_select_drops_repeated_ids() {
        let ids: Vec<String> = ["usd_cny", "caixin_services_index", "usd_cny", "usd_cny"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (found, unknown) = Registry::select(&ids);
        let found: Vec<_> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, vec!["usd_cny", "caixin_services_index"]);
        assert!(unknown.is_empty());
    }
}
