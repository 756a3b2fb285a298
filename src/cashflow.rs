use crate::error::{NormalizerError, Result};
use crate::schema::{CashFlowLineItem, CashFlowSection, CashFlowSummary, Cell, NormalizedSheet};
use crate::utils::clean_amount;
use log::debug;
use std::cmp::Ordering;

/// Phrases marking summary/header lines inside a Statement of Cash Flows.
/// These rows restate section totals in the same amount column as the detail
/// lines, so they are excluded from positional sums and from the
/// actual-cash-transaction views.
const SUMMARY_PHRASES: &[&str] = &[
    "net cash provided",
    "net cash used",
    "total",
    "cash at beginning",
    "cash at end",
    "net cash increase",
    "net cash decrease",
];

fn is_summary_row(line_item: &str) -> bool {
    let lower = line_item.to_lowercase();
    SUMMARY_PHRASES.iter().any(|p| lower.contains(p))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

struct CashFlowRow {
    line_item: String,
    amount: f64,
}

/// A column is usable when it is named (not an `Unnamed_{i}` placeholder) or
/// carries any data. Trailing padding columns from ragged exports are
/// ignored; anything else breaks the two-column precondition.
fn usable_columns(sheet: &NormalizedSheet) -> Vec<usize> {
    (0..sheet.columns.len())
        .filter(|&i| {
            !sheet.columns[i].starts_with("Unnamed_")
                || sheet.rows.iter().any(|r| {
                    r.get(i).map(|c| !c.is_empty()).unwrap_or(false)
                })
        })
        .collect()
}

fn collect_rows(sheet: &NormalizedSheet, item_col: usize, amount_col: usize) -> Vec<CashFlowRow> {
    let mut rows = Vec::new();
    for row in &sheet.rows {
        let line_item = row.get(item_col).map(|c| c.as_text()).unwrap_or_default();
        let amount = match row.get(amount_col) {
            Some(Cell::Number(n)) => Some(*n),
            Some(Cell::Text(s)) => clean_amount(s),
            _ => None,
        };
        if line_item.is_empty() && amount.is_none() {
            continue;
        }
        // Section markers carry no amount of their own; they participate in
        // boundary search with a zero amount.
        rows.push(CashFlowRow {
            line_item,
            amount: amount.unwrap_or(0.0),
        });
    }
    rows
}

fn find_marker(rows: &[CashFlowRow], marker: &str) -> Option<usize> {
    rows.iter().position(|r| contains_ci(&r.line_item, marker))
}

/// Sum over rows strictly between `start` (exclusive) and `end` (exclusive),
/// skipping summary lines so embedded subtotals are not double-counted.
fn section_sum(rows: &[CashFlowRow], start: usize, end: usize) -> f64 {
    rows[start + 1..end.max(start + 1)]
        .iter()
        .filter(|r| !is_summary_row(&r.line_item))
        .map(|r| r.amount)
        .sum()
}

fn section_items(
    rows: &[CashFlowRow],
    range: std::ops::Range<usize>,
    section: CashFlowSection,
) -> Vec<CashFlowLineItem> {
    rows[range]
        .iter()
        .map(|r| CashFlowLineItem {
            line_item: r.line_item.clone(),
            amount: r.amount,
            section,
        })
        .collect()
}

/// Derives a cash-flow summary from a two-column (line item, amount)
/// Statement of Cash Flows. Section membership is positional: rows between a
/// section marker and the next marker belong to that section. Missing markers
/// degrade the corresponding subtotal to 0 rather than failing the sheet; a
/// wrong column shape is a hard error.
pub fn extract_cash_flow(sheet: &NormalizedSheet) -> Result<CashFlowSummary> {
    let cols = usable_columns(sheet);
    if cols.len() != 2 {
        return Err(NormalizerError::CashFlowShape(cols.len()));
    }
    let rows = collect_rows(sheet, cols[0], cols[1]);
    let len = rows.len();

    let operating_start = find_marker(&rows, "OPERATING ACTIVITIES");
    let investing_start = find_marker(&rows, "INVESTING ACTIVITIES");
    let financing_start = find_marker(&rows, "FINANCING ACTIVITIES");

    if operating_start.is_none() && investing_start.is_none() && financing_start.is_none() {
        debug!(
            "No section markers found in '{}'; returning all-zero summary",
            sheet.name
        );
    }

    let operating_cf = operating_start
        .map(|s| section_sum(&rows, s, investing_start.unwrap_or(len)))
        .unwrap_or(0.0);
    let investing_cf = investing_start
        .map(|s| section_sum(&rows, s, financing_start.unwrap_or(len)))
        .unwrap_or(0.0);
    let financing_cf = financing_start
        .map(|s| section_sum(&rows, s, len))
        .unwrap_or(0.0);

    let net_income: f64 = rows
        .iter()
        .filter(|r| contains_ci(&r.line_item, "Net Income"))
        .map(|r| r.amount)
        .sum();

    let net_cash_change = operating_cf + investing_cf + financing_cf;
    let free_cash_flow = operating_cf + investing_cf;

    // Actual cash transactions live in the Investing and Financing sections
    // only; Operating rows are reconciliation adjustments, not cash moves.
    let mut actual_cash: Vec<CashFlowLineItem> = Vec::new();
    if let Some(inv) = investing_start {
        let end = financing_start.unwrap_or(len);
        actual_cash.extend(section_items(&rows, inv + 1..end, CashFlowSection::Investing));
    }
    if let Some(fin) = financing_start {
        let end = rows
            .iter()
            .position(|r| {
                contains_ci(&r.line_item, "Net cash increase")
                    || contains_ci(&r.line_item, "Net cash decrease")
            })
            .unwrap_or(len)
            .max(fin + 1);
        actual_cash.extend(section_items(&rows, fin + 1..end, CashFlowSection::Financing));
    }
    actual_cash.retain(|item| !is_summary_row(&item.line_item) && item.amount != 0.0);

    let mut outflows: Vec<CashFlowLineItem> = actual_cash
        .iter()
        .filter(|i| i.amount < 0.0)
        .cloned()
        .collect();
    outflows.sort_by(|a, b| a.amount.partial_cmp(&b.amount).unwrap_or(Ordering::Equal));
    outflows.truncate(5);

    let mut inflows: Vec<CashFlowLineItem> = actual_cash
        .iter()
        .filter(|i| i.amount > 0.0)
        .cloned()
        .collect();
    inflows.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
    inflows.truncate(5);

    let operating_items = extract_operating_items(&rows, operating_start, investing_start);

    Ok(CashFlowSummary {
        net_income,
        operating_cf,
        investing_cf,
        financing_cf,
        net_cash_change,
        free_cash_flow,
        top_inflows: inflows,
        top_outflows: outflows,
        operating_items,
    })
}

/// The operating-activities detail spans from the "Net Income" row
/// (inclusive) to the "Net cash provided/used in operating" row (exclusive),
/// falling back to the OPERATING -> INVESTING span when the Net Income marker
/// is absent. Summary and header rows are excluded either way.
fn extract_operating_items(
    rows: &[CashFlowRow],
    operating_start: Option<usize>,
    investing_start: Option<usize>,
) -> Vec<CashFlowLineItem> {
    let Some(op) = operating_start else {
        return Vec::new();
    };

    let net_income_idx = find_marker(rows, "Net Income");
    let net_cash_operating_idx = rows.iter().position(|r| {
        contains_ci(&r.line_item, "Net cash provided by operating")
            || contains_ci(&r.line_item, "Net cash used in operating")
    });

    let range = match (net_income_idx, net_cash_operating_idx) {
        (Some(ni), Some(nco)) if ni < nco => ni..nco,
        _ => match investing_start {
            Some(inv) if inv > op => op + 1..inv,
            _ => return Vec::new(),
        },
    };

    section_items(rows, range, CashFlowSection::Operating)
        .into_iter()
        .filter(|item| {
            !is_summary_row(&item.line_item)
                && !contains_ci(&item.line_item, "OPERATING ACTIVITIES")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn sheet(rows: Vec<(&str, Option<f64>)>) -> NormalizedSheet {
        NormalizedSheet {
            name: "Cash flow".to_string(),
            columns: vec!["Line Item".to_string(), "Amount".to_string()],
            rows: rows
                .into_iter()
                .map(|(item, amount)| {
                    vec![
                        text(item),
                        amount.map(Cell::Number).unwrap_or(Cell::Empty),
                    ]
                })
                .collect(),
        }
    }

    fn quickbooks_sheet() -> NormalizedSheet {
        sheet(vec![
            ("OPERATING ACTIVITIES", None),
            ("Net Income", Some(5000.0)),
            ("Depreciation", Some(200.0)),
            ("Net cash provided by operating activities", Some(5200.0)),
            ("INVESTING ACTIVITIES", None),
            ("Purchase of equipment", Some(-3000.0)),
            ("FINANCING ACTIVITIES", None),
            ("Loan proceeds", Some(1000.0)),
            ("Net cash increase", Some(3200.0)),
        ])
    }

    #[test]
    fn test_section_subtotals() {
        let summary = extract_cash_flow(&quickbooks_sheet()).unwrap();
        assert_eq!(summary.operating_cf, 5200.0);
        assert_eq!(summary.investing_cf, -3000.0);
        assert_eq!(summary.financing_cf, 1000.0);
        assert_eq!(summary.net_cash_change, 3200.0);
        assert_eq!(summary.free_cash_flow, 2200.0);
        assert_eq!(summary.net_income, 5000.0);
    }

    #[test]
    fn test_net_change_identity() {
        let summary = extract_cash_flow(&quickbooks_sheet()).unwrap();
        assert_eq!(
            summary.net_cash_change,
            summary.operating_cf + summary.investing_cf + summary.financing_cf
        );
    }

    #[test]
    fn test_top_flows_exclude_operating_reconciliation() {
        let summary = extract_cash_flow(&quickbooks_sheet()).unwrap();
        assert_eq!(summary.top_outflows.len(), 1);
        assert_eq!(summary.top_outflows[0].line_item, "Purchase of equipment");
        assert_eq!(summary.top_outflows[0].amount, -3000.0);
        assert_eq!(summary.top_inflows.len(), 1);
        assert_eq!(summary.top_inflows[0].line_item, "Loan proceeds");
        // Depreciation is an operating add-back, never a cash transaction.
        assert!(summary
            .top_inflows
            .iter()
            .all(|i| i.line_item != "Depreciation"));
    }

    #[test]
    fn test_operating_items_span() {
        let summary = extract_cash_flow(&quickbooks_sheet()).unwrap();
        let names: Vec<&str> = summary
            .operating_items
            .iter()
            .map(|i| i.line_item.as_str())
            .collect();
        assert_eq!(names, vec!["Net Income", "Depreciation"]);
        assert!(summary
            .operating_items
            .iter()
            .all(|i| i.section == CashFlowSection::Operating));
    }

    #[test]
    fn test_missing_financing_marker() {
        let summary = extract_cash_flow(&sheet(vec![
            ("OPERATING ACTIVITIES", None),
            ("Net Income", Some(400.0)),
            ("INVESTING ACTIVITIES", None),
            ("Purchase of laptop", Some(-1500.0)),
        ]))
        .unwrap();
        assert_eq!(summary.financing_cf, 0.0);
        // Investing runs to end of sheet.
        assert_eq!(summary.investing_cf, -1500.0);
        assert_eq!(summary.operating_cf, 400.0);
    }

    #[test]
    fn test_no_markers_yields_zero_summary() {
        let summary = extract_cash_flow(&sheet(vec![
            ("Some narrative line", Some(10.0)),
            ("Another line", Some(20.0)),
        ]))
        .unwrap();
        assert_eq!(summary.operating_cf, 0.0);
        assert_eq!(summary.investing_cf, 0.0);
        assert_eq!(summary.financing_cf, 0.0);
        assert_eq!(summary.net_cash_change, 0.0);
    }

    #[test]
    fn test_wrong_shape_is_hard_error() {
        let bad = NormalizedSheet {
            name: "Cash flow".to_string(),
            columns: vec![
                "Line Item".to_string(),
                "Amount".to_string(),
                "Memo".to_string(),
            ],
            rows: vec![vec![text("x"), Cell::Number(1.0), text("note")]],
        };
        let err = extract_cash_flow(&bad).unwrap_err();
        assert!(matches!(err, NormalizerError::CashFlowShape(3)));
    }

    #[test]
    fn test_multiple_net_income_rows_are_summed() {
        let summary = extract_cash_flow(&sheet(vec![
            ("OPERATING ACTIVITIES", None),
            ("Net Income", Some(100.0)),
            ("Net Income (adjustment)", Some(25.0)),
        ]))
        .unwrap();
        assert_eq!(summary.net_income, 125.0);
    }
}
