use crate::models::{ColumnLayout, ParsedField, ParsedRow, RawRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Parsed(ParsedRow),
    Rejected(Rejection),
}

/// Why a row was dropped. Header remnants, separators and truncated markup all
/// land here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    CellCount { expected: usize, found: usize },
}

/// Maps a raw row onto `layout`, or rejects it when the cell count differs.
pub fn parse_row(row: &RawRow, layout: &ColumnLayout) -> RowOutcome {
    if row.len() != layout.expected_cells {
        return RowOutcome::Rejected(Rejection::CellCount {
            expected: layout.expected_cells,
            found: row.len(),
        });
    }

    let fields = layout
        .fields
        .iter()
        .map(|spec| ParsedField {
            name: spec.name,
            kind: spec.kind,
            // A layout pointing past the row is treated as an empty cell.
            text: row
                .cells
                .get(spec.cell)
                .map(|c| c.trim().to_string())
                .unwrap_or_default(),
        })
        .collect();

    RowOutcome::Parsed(ParsedRow { fields })
}
