use crate::schema::{Cell, DetectedHeader, NormalizedSheet, RawSheet};
use crate::utils::{clean_amount, excel_serial_to_date};
use chrono::NaiveDate;
use log::debug;

/// Tuned heuristic configuration for header-row detection. The keyword list
/// and bonus rules target the QuickBooks Online report family; injecting them
/// keeps the scanning algorithm independent of the tuning.
#[derive(Debug, Clone)]
pub struct HeaderHeuristics {
    /// Scores +1 per keyword appearing as a substring of any cell in the row.
    pub keywords: Vec<String>,
    /// Extra points when every listed cell appears verbatim in the row.
    pub bonus_rules: Vec<BonusRule>,
    pub max_scan_rows: usize,
}

#[derive(Debug, Clone)]
pub struct BonusRule {
    pub cells: Vec<String>,
    pub points: i32,
}

impl Default for HeaderHeuristics {
    fn default() -> Self {
        Self {
            keywords: [
                "Date",
                "Account",
                "Total",
                "Current",
                "Distribution account",
                "Type",
                "1 - 30",
                "Balance",
                "Amount",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            bonus_rules: vec![
                // A row holding both "Current" and "Total" is almost always an
                // AR/AP aging header.
                BonusRule {
                    cells: vec!["current".to_string(), "total".to_string()],
                    points: 5,
                },
            ],
            max_scan_rows: 20,
        }
    }
}

/// Scans the first `max_scan_rows` rows of a raw grid and promotes the
/// best-scoring row to column headers. Ties keep the topmost row. Returns
/// None when no row scores, in which case the sheet is treated as
/// non-tabular and skipped.
pub fn locate_header(sheet: &RawSheet, heuristics: &HeaderHeuristics) -> Option<DetectedHeader> {
    let mut best: Option<DetectedHeader> = None;

    for (idx, row) in sheet.rows.iter().take(heuristics.max_scan_rows).enumerate() {
        let cells_lower: Vec<String> = row.iter().map(|c| c.as_text().to_lowercase()).collect();

        let mut score = heuristics
            .keywords
            .iter()
            .filter(|k| {
                let k = k.to_lowercase();
                cells_lower.iter().any(|cell| cell.contains(&k))
            })
            .count() as i32;

        for rule in &heuristics.bonus_rules {
            if rule.cells.iter().all(|c| cells_lower.contains(c)) {
                score += rule.points;
            }
        }

        let current_max = best.as_ref().map(|b| b.score).unwrap_or(0);
        if score > current_max {
            best = Some(DetectedHeader {
                row_index: idx,
                column_names: clean_column_names(row),
                score,
            });
        }
    }

    best
}

pub fn clean_column_names(row: &[Cell]) -> Vec<String> {
    let mut names = Vec::with_capacity(row.len());
    for cell in row {
        let name = cell.as_text().replace('\n', " ").trim().to_string();
        if name.is_empty() || name.eq_ignore_ascii_case("nan") {
            names.push(format!("Unnamed_{}", names.len()));
        } else {
            names.push(name);
        }
    }
    names
}

const AMOUNT_HINTS: &[&str] = &[
    "amount", "balance", "total", "current", "1 - 30", "31 - 60", "61 - 90",
];

fn is_amount_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    AMOUNT_HINTS.iter().any(|h| lower.contains(h))
}

fn is_date_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("date") || lower.contains("month")
}

fn coerce_date(cell: &Cell) -> Cell {
    match cell {
        Cell::Date(_) => cell.clone(),
        Cell::Number(n) => excel_serial_to_date(*n).map(Cell::Date).unwrap_or(Cell::Empty),
        Cell::Text(s) => {
            let s = s.trim();
            for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Cell::Date(d);
                }
            }
            cell.clone()
        }
        Cell::Empty => Cell::Empty,
    }
}

fn coerce_amount(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(_) => cell.clone(),
        // Unparseable and empty values coerce to 0, matching the source
        // report convention of blank subtotal cells.
        Cell::Text(s) => Cell::Number(clean_amount(s).unwrap_or(0.0)),
        Cell::Date(_) | Cell::Empty => Cell::Number(0.0),
    }
}

/// Promotes the detected header and cleans the sheet body: rows are padded to
/// the header width, fully empty rows are dropped, amount-like columns are
/// numerically cleaned, and date-like columns are coerced to dates.
pub fn normalize_sheet(sheet: &RawSheet, header: &DetectedHeader) -> NormalizedSheet {
    let columns = header.column_names.clone();
    let width = columns.len();

    let amount_cols: Vec<bool> = columns.iter().map(|c| is_amount_column(c)).collect();
    let date_cols: Vec<bool> = columns.iter().map(|c| is_date_column(c)).collect();

    let mut rows = Vec::new();
    for raw_row in sheet.rows.iter().skip(header.row_index + 1) {
        if raw_row.iter().all(|c| c.is_empty()) {
            continue;
        }
        let mut row = Vec::with_capacity(width);
        for i in 0..width {
            let cell = raw_row.get(i).cloned().unwrap_or(Cell::Empty);
            // Date coercion runs first so aging headers like "Due date" can
            // never be mistaken for an amount.
            let cell = if date_cols[i] {
                coerce_date(&cell)
            } else if amount_cols[i] {
                coerce_amount(&cell)
            } else {
                cell
            };
            row.push(cell);
        }
        rows.push(row);
    }

    debug!(
        "Normalized sheet '{}': header row {}, {} columns, {} data rows",
        sheet.name,
        header.row_index,
        width,
        rows.len()
    );

    NormalizedSheet {
        name: sheet.name.clone(),
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_locate_header_picks_max_score() {
        let sheet = RawSheet::new(
            "AR",
            vec![
                vec![text("Aging report"), Cell::Empty],
                vec![text("As of June 30")],
                vec![text("Customer"), text("Current"), text("1 - 30"), text("Total")],
                vec![text("Acme"), Cell::Number(10.0), Cell::Number(5.0), Cell::Number(15.0)],
            ],
        );
        let header = locate_header(&sheet, &HeaderHeuristics::default()).unwrap();
        assert_eq!(header.row_index, 2);
        // "Total", "Current", "1 - 30" keywords plus the aging bonus.
        assert!(header.score >= 8, "score was {}", header.score);
    }

    #[test]
    fn test_locate_header_tie_keeps_topmost() {
        let sheet = RawSheet::new(
            "S",
            vec![
                vec![text("Date"), text("Amount")],
                vec![text("Date"), text("Amount")],
            ],
        );
        let header = locate_header(&sheet, &HeaderHeuristics::default()).unwrap();
        assert_eq!(header.row_index, 0);
    }

    #[test]
    fn test_locate_header_none_when_nothing_scores() {
        let sheet = RawSheet::new(
            "Notes",
            vec![
                vec![text("Instructions for the reader")],
                vec![text("See attached memo")],
            ],
        );
        assert!(locate_header(&sheet, &HeaderHeuristics::default()).is_none());
    }

    #[test]
    fn test_locate_header_respects_scan_limit() {
        let mut rows = vec![vec![text("noise")]; 25];
        rows.push(vec![text("Date"), text("Amount")]);
        let sheet = RawSheet::new("S", rows);
        assert!(locate_header(&sheet, &HeaderHeuristics::default()).is_none());
    }

    #[test]
    fn test_normalize_cleans_amount_columns() {
        let sheet = RawSheet::new(
            "AP",
            vec![
                vec![text("Vendor"), text("Total")],
                vec![text("Supplies Co"), text("$1,200.00")],
                vec![text("Landlord"), text("(500.00)")],
                vec![text("Ghost"), text("n/a")],
                vec![Cell::Empty, Cell::Empty],
            ],
        );
        let header = locate_header(&sheet, &HeaderHeuristics::default()).unwrap();
        let normalized = normalize_sheet(&sheet, &header);
        assert_eq!(normalized.rows.len(), 3);
        assert_eq!(normalized.rows[0][1], Cell::Number(1200.0));
        assert_eq!(normalized.rows[1][1], Cell::Number(-500.0));
        assert_eq!(normalized.rows[2][1], Cell::Number(0.0));
    }

    #[test]
    fn test_normalize_names_blank_columns() {
        let sheet = RawSheet::new(
            "GL",
            vec![
                vec![Cell::Empty, text("Date"), text("Amount")],
                vec![text("Acme"), text("01/15/2025"), Cell::Number(10.0)],
            ],
        );
        let header = locate_header(&sheet, &HeaderHeuristics::default()).unwrap();
        let normalized = normalize_sheet(&sheet, &header);
        assert_eq!(normalized.columns[0], "Unnamed_0");
        assert_eq!(
            normalized.rows[0][1],
            Cell::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
        );
    }
}
