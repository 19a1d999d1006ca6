use crate::error::TableNotFound;
use crate::models::RawRow;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::fmt;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("static selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("static selector"));

/// Which table on the page holds the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableTarget {
    /// `<table id="...">`
    Id(String),
    /// nth `<table>` in document order, zero-based
    Position(usize),
}

impl TableTarget {
    /// CSS selector that is present once the table has been rendered.
    pub fn ready_selector(&self) -> String {
        match self {
            TableTarget::Id(id) => format!("table#{}", id),
            TableTarget::Position(_) => "table".to_string(),
        }
    }

    /// How many elements `ready_selector` must match: the nth table only
    /// exists once n + 1 tables do.
    pub fn ready_matches(&self) -> usize {
        match self {
            TableTarget::Id(_) => 1,
            TableTarget::Position(n) => n + 1,
        }
    }
}

impl fmt::Display for TableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableTarget::Id(id) => write!(f, "table#{}", id),
            TableTarget::Position(n) => write!(f, "table[{}]", n),
        }
    }
}

/// Which `tr` elements count as rows of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowScope {
    /// Rows whose nearest enclosing table is the target (nested tables excluded)
    Direct,
    /// Every row inside the target, nested tables included
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSelector {
    pub target: TableTarget,
    pub scope: RowScope,
    /// Leading rows to drop (1 for tables with an explicit header row)
    pub skip_rows: usize,
}

impl TableSelector {
    pub fn by_id(id: &str) -> Self {
        Self {
            target: TableTarget::Id(id.to_string()),
            scope: RowScope::All,
            skip_rows: 0,
        }
    }

    pub fn direct_rows(mut self) -> Self {
        self.scope = RowScope::Direct;
        self
    }

    pub fn skip(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }
}

/// Finds the target table in `markup` and returns its rows as cell texts.
///
/// Only `td` cells are collected, so header rows made of `th` come back empty
/// and are left for the row parser to reject.
pub fn locate(markup: &str, selector: &TableSelector) -> Result<Vec<RawRow>, TableNotFound> {
    let document = Html::parse_document(markup);

    let table = find_table(&document, &selector.target).ok_or_else(|| TableNotFound {
        selector: selector.target.to_string(),
    })?;

    let rows = table
        .select(&ROW)
        .filter(|tr| match selector.scope {
            RowScope::All => true,
            RowScope::Direct => {
                tr.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|e| e.value().name() == "table")
                    == Some(table)
            }
        })
        .skip(selector.skip_rows)
        .map(|tr| row_cells(&tr))
        .collect();

    Ok(rows)
}

fn find_table<'a>(document: &'a Html, target: &TableTarget) -> Option<ElementRef<'a>> {
    match target {
        TableTarget::Id(id) => document
            .select(&TABLE)
            .find(|t| t.value().id() == Some(id.as_str())),
        TableTarget::Position(n) => document.select(&TABLE).nth(*n),
    }
}

fn row_cells(row: &ElementRef) -> RawRow {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .map(|cell| cell.text().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY_PAGE: &str = r#"
        <html><body>
          <table class="nav"><tr><td>menu</td></tr></table>
          <table id="curr_table">
            <thead><tr><th>Data</th><th>Último</th></tr></thead>
            <tbody>
              <tr><td>05.03.2024</td><td>1234.50</td></tr>
              <tr><td>04.03.2024</td><td>1230.00</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_locate_by_id_skips_header() {
        let rows = locate(HISTORY_PAGE, &TableSelector::by_id("curr_table").skip(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["05.03.2024", "1234.50"]);
        assert_eq!(rows[1].cells, vec!["04.03.2024", "1230.00"]);
    }

    #[test]
    fn test_header_row_has_no_td_cells() {
        let rows = locate(HISTORY_PAGE, &TableSelector::by_id("curr_table")).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
    }

    #[test]
    fn test_locate_by_position() {
        let selector = TableSelector {
            target: TableTarget::Position(0),
            scope: RowScope::All,
            skip_rows: 0,
        };
        let rows = locate(HISTORY_PAGE, &selector).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells, vec!["menu"]);
    }

    #[test]
    fn test_ready_condition_covers_position() {
        let third = TableTarget::Position(2);
        assert_eq!(third.ready_selector(), "table");
        assert_eq!(third.ready_matches(), 3);

        let by_id = TableTarget::Id("curr_table".into());
        assert_eq!(by_id.ready_selector(), "table#curr_table");
        assert_eq!(by_id.ready_matches(), 1);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let err = locate(HISTORY_PAGE, &TableSelector::by_id("economicCalendarData")).unwrap_err();
        assert_eq!(err.selector, "table#economicCalendarData");
    }

    #[test]
    fn test_direct_rows_ignore_nested_tables() {
        let page = r#"
            <table id="economicCalendarData">
              <tr><td>05/03/2024</td><td>52,5</td>
                  <td><table><tr><td>tooltip</td></tr></table></td></tr>
              <tr><td>05/02/2024</td><td>52,7</td><td></td></tr>
            </table>
        "#;
        let direct = TableSelector::by_id("economicCalendarData").direct_rows();
        let rows = locate(page, &direct).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells, vec!["05/02/2024", "52,7", ""]);

        let all = locate(page, &TableSelector::by_id("economicCalendarData")).unwrap();
        assert_eq!(all.len(), 3);
    }
}
