use crate::classifier::classify_rows;
use crate::months::parse_month_label;
use crate::schema::{CanonicalRecord, Cell, LineType, MonthlyTable, NormalizedSheet, TableKind};
use crate::utils::clean_amount;
use log::debug;

/// Account-name labels that are structural section rows rather than data.
const SECTION_LABELS: &[&str] = &[
    "Income",
    "Expenses",
    "Cost of Goods Sold",
    "Gross Profit",
    "Other Income",
    "Other Expenses",
];

fn is_structural_row(account: &str) -> bool {
    let lower = account.to_lowercase();
    if lower.contains("total") || lower.contains("net ") {
        return true;
    }
    SECTION_LABELS
        .iter()
        .any(|l| account.trim().eq_ignore_ascii_case(l))
}

/// Index of the identifier (account name) column: the first header matching
/// "account" or "source", defaulting to the first column.
fn identifier_column(sheet: &NormalizedSheet) -> usize {
    sheet
        .columns
        .iter()
        .position(|c| {
            let lower = c.to_lowercase();
            lower.contains("account") || lower.contains("source")
        })
        .unwrap_or(0)
}

fn cell_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => clean_amount(s),
        Cell::Date(_) | Cell::Empty => None,
    }
}

/// Unpivots a wide (account x month) P&L sheet into the four canonical
/// monthly tables. Always returns all four tables in `TableKind::ALL` order,
/// possibly empty. Pure transform: running it twice on the same sheet yields
/// identical output.
///
/// Subtotal columns ("Total") are never unpivoted, structural rows are
/// filtered, and records with an unparseable month or missing amount are
/// dropped. COGS rows are classified but enter none of the four tables;
/// changing that would silently alter reported margins downstream.
pub fn reshape(sheet: &NormalizedSheet) -> Vec<MonthlyTable> {
    let id_col = identifier_column(sheet);

    let value_cols: Vec<usize> = (0..sheet.columns.len())
        .filter(|&i| i != id_col && !sheet.columns[i].to_lowercase().contains("total"))
        .collect();

    // Month labels parse once per column; unparseable columns drop all of
    // their records.
    let months: Vec<_> = value_cols
        .iter()
        .map(|&i| parse_month_label(&sheet.columns[i]))
        .collect();

    let labels: Vec<String> = sheet
        .rows
        .iter()
        .map(|row| row.get(id_col).map(|c| c.as_text()).unwrap_or_default())
        .collect();
    let types = classify_rows(&labels);

    let mut tables: Vec<MonthlyTable> = TableKind::ALL
        .iter()
        .map(|&kind| MonthlyTable {
            kind,
            records: Vec::new(),
        })
        .collect();

    let mut cogs_dropped = 0usize;
    let mut unparsed_dropped = 0usize;

    for (row, &line_type) in sheet.rows.iter().zip(&types) {
        let account = row.get(id_col).map(|c| c.as_text()).unwrap_or_default();
        if account.is_empty() || is_structural_row(&account) {
            continue;
        }

        for (&col, month) in value_cols.iter().zip(&months) {
            let Some(month) = month else {
                unparsed_dropped += 1;
                continue;
            };
            let Some(amount) = row.get(col).and_then(cell_amount) else {
                unparsed_dropped += 1;
                continue;
            };

            if line_type == LineType::Cogs {
                cogs_dropped += 1;
                continue;
            }

            let record = CanonicalRecord {
                account: account.clone(),
                month: *month,
                amount,
                line_type,
            };
            if let Some(table) = tables.iter_mut().find(|t| t.kind.accepts(line_type)) {
                table.records.push(record);
            }
        }
    }

    debug!(
        "Reshaped '{}': {} records ({} COGS dropped, {} unparseable dropped)",
        sheet.name,
        tables.iter().map(|t| t.records.len()).sum::<usize>(),
        cogs_dropped,
        unparsed_dropped
    );

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn pnl_sheet() -> NormalizedSheet {
        NormalizedSheet {
            name: "MOM PL".to_string(),
            columns: vec![
                "Distribution account".to_string(),
                "Jan 2025".to_string(),
                "Feb 2025".to_string(),
                "Total".to_string(),
            ],
            rows: vec![
                vec![text("Income"), Cell::Empty, Cell::Empty, Cell::Empty],
                vec![
                    text("Consulting"),
                    Cell::Number(1000.0),
                    Cell::Number(1200.0),
                    Cell::Number(2200.0),
                ],
                vec![text("Total for Income"), Cell::Empty, Cell::Empty, Cell::Number(2200.0)],
                vec![text("Expenses"), Cell::Empty, Cell::Empty, Cell::Empty],
                vec![
                    text("Rent"),
                    Cell::Number(500.0),
                    Cell::Number(500.0),
                    Cell::Number(1000.0),
                ],
                vec![text("Net Earnings"), Cell::Empty, Cell::Empty, Cell::Number(1200.0)],
            ],
        }
    }

    #[test]
    fn test_reshape_partitions_and_skips_total_column() {
        let tables = reshape(&pnl_sheet());
        let sales = &tables[0];
        assert_eq!(sales.kind, TableKind::Sales);
        assert_eq!(sales.records.len(), 2);
        assert_eq!(sales.records[0].account, "Consulting");
        assert_eq!(
            sales.records[0].month,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(sales.records[0].amount, 1000.0);
        assert_eq!(sales.records[1].amount, 1200.0);
        // 2200 from the Total column must never appear.
        assert!(sales.records.iter().all(|r| r.amount != 2200.0));

        let expenses = &tables[1];
        assert_eq!(expenses.records.len(), 2);
        assert!(expenses.records.iter().all(|r| r.account == "Rent"));
    }

    #[test]
    fn test_reshape_filters_structural_rows() {
        let tables = reshape(&pnl_sheet());
        for table in &tables {
            for record in &table.records {
                assert!(!record.account.to_lowercase().contains("total"));
                assert!(!record.account.to_lowercase().contains("net "));
            }
        }
    }

    #[test]
    fn test_reshape_drops_cogs() {
        let sheet = NormalizedSheet {
            name: "MOM PL".to_string(),
            columns: vec!["Distribution account".to_string(), "Jan 2025".to_string()],
            rows: vec![
                vec![text("Cost of Goods Sold"), Cell::Empty],
                vec![text("Materials"), Cell::Number(300.0)],
            ],
        };
        let tables = reshape(&sheet);
        assert!(tables.iter().all(|t| t.is_empty()));
    }

    #[test]
    fn test_reshape_is_idempotent() {
        let sheet = pnl_sheet();
        let first = reshape(&sheet);
        let second = reshape(&sheet);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.records, b.records);
        }
    }

    #[test]
    fn test_reshape_defaults_identifier_to_first_column() {
        let sheet = NormalizedSheet {
            name: "P&L".to_string(),
            columns: vec!["Unnamed_0".to_string(), "Jan 2025".to_string()],
            rows: vec![
                vec![text("Income"), Cell::Empty],
                vec![text("Sales"), Cell::Number(10.0)],
            ],
        };
        let tables = reshape(&sheet);
        assert_eq!(tables[0].records.len(), 1);
        assert_eq!(tables[0].records[0].account, "Sales");
    }
}
