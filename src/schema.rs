use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single untyped spreadsheet cell as loaded from the workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Lower-cased trimmed text rendition used by the header and
    /// classification heuristics. Numbers and dates render through Display.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Empty => String::new(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// An ordered grid of untyped cells with no header assumed. Created once per
/// workbook sheet at load and discarded after normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

/// Result of header-row detection. A score of zero is never produced; sheets
/// where no row scores are skipped instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHeader {
    pub row_index: usize,
    pub column_names: Vec<String>,
    pub score: i32,
}

/// A sheet after header promotion and column cleaning. Column names are
/// trimmed, newline-free, and never blank (`Unnamed_{i}` placeholders).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl NormalizedSheet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, row order preserved.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |r| r.get(index))
    }
}

/// Composite accounting classification stamped onto every P&L row by the
/// section state machine. `Unclassified` is the initial state: a sheet with no
/// recognized section headers yields it on every row, which callers should
/// read as "layout not recognized" rather than as a real category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineType {
    OperatingIncome,
    OperatingExpense,
    Cogs,
    OtherIncome,
    OtherExpense,
    Unclassified,
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineType::OperatingIncome => "Operating Income",
            LineType::OperatingExpense => "Operating Expense",
            LineType::Cogs => "COGS",
            LineType::OtherIncome => "Other Income",
            LineType::OtherExpense => "Other Expense",
            LineType::Unclassified => "Unclassified",
        };
        f.write_str(s)
    }
}

/// One long-form record produced by unpivoting a wide P&L sheet. `month` is
/// always the first day of its calendar month; day-range information from the
/// source label is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub account: String,
    pub month: NaiveDate,
    pub amount: f64,
    pub line_type: LineType,
}

/// Identity of one of the four canonical monthly tables. Record amounts keep
/// their source sign; the table identity, not a column name, tells the caller
/// whether the figures are income or expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Sales,
    Expenses,
    OtherIncome,
    OtherExpenses,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Sales,
        TableKind::Expenses,
        TableKind::OtherIncome,
        TableKind::OtherExpenses,
    ];

    /// The canonical sheet name used by downstream consumers.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TableKind::Sales => "Sales_Monthly",
            TableKind::Expenses => "Expenses_Monthly",
            TableKind::OtherIncome => "Other_Income_Monthly",
            TableKind::OtherExpenses => "Other_Expenses_Monthly",
        }
    }

    pub fn accepts(&self, line_type: LineType) -> bool {
        matches!(
            (self, line_type),
            (TableKind::Sales, LineType::OperatingIncome)
                | (TableKind::Expenses, LineType::OperatingExpense)
                | (TableKind::OtherIncome, LineType::OtherIncome)
                | (TableKind::OtherExpenses, LineType::OtherExpense)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTable {
    pub kind: TableKind,
    pub records: Vec<CanonicalRecord>,
}

impl MonthlyTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of amounts per month, chronological.
    pub fn monthly_totals(&self) -> BTreeMap<NaiveDate, f64> {
        let mut totals = BTreeMap::new();
        for record in &self.records {
            *totals.entry(record.month).or_insert(0.0) += record.amount;
        }
        totals
    }

    /// Sum of amounts per account name.
    pub fn account_totals(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for record in &self.records {
            *totals.entry(record.account.clone()).or_insert(0.0) += record.amount;
        }
        totals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashFlowSection {
    Operating,
    Investing,
    Financing,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowLineItem {
    pub line_item: String,
    pub amount: f64,
    pub section: CashFlowSection,
}

/// Summary derived from a two-column Statement of Cash Flows.
/// `net_cash_change` equals the sum of the three section subtotals by
/// construction. An all-zero summary signals an unrecognized layout, not a
/// genuinely flat cash position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub net_income: f64,
    pub operating_cf: f64,
    pub investing_cf: f64,
    pub financing_cf: f64,
    pub net_cash_change: f64,
    pub free_cash_flow: f64,
    pub top_inflows: Vec<CashFlowLineItem>,
    pub top_outflows: Vec<CashFlowLineItem>,
    pub operating_items: Vec<CashFlowLineItem>,
}

/// Closed classification of AR/AP aging column headers. Unrecognized headers
/// are carried explicitly instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
    Unrecognized(String),
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgingBucket::Current => f.write_str("Current"),
            AgingBucket::Days1To30 => f.write_str("1 - 30"),
            AgingBucket::Days31To60 => f.write_str("31 - 60"),
            AgingBucket::Days61To90 => f.write_str("61 - 90"),
            AgingBucket::Over90 => f.write_str("91 and over"),
            AgingBucket::Unrecognized(s) => f.write_str(s),
        }
    }
}

/// Final pipeline output: every sheet the header heuristic recognized, the
/// four canonical monthly tables, and the cash-flow summary when a "Cash flow"
/// sheet was present and well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedWorkbook {
    pub sheets: BTreeMap<String, NormalizedSheet>,
    pub monthly: Vec<MonthlyTable>,
    pub cash_flow: Option<CashFlowSummary>,
}

impl ParsedWorkbook {
    pub fn table(&self, kind: TableKind) -> Option<&MonthlyTable> {
        self.monthly.iter().find(|t| t.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_trims() {
        assert_eq!(Cell::Text("  Rent ".to_string()).as_text(), "Rent");
        assert_eq!(Cell::Empty.as_text(), "");
        assert!(Cell::Text("   ".to_string()).is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }

    #[test]
    fn test_table_kind_partition_is_exclusive() {
        for lt in [
            LineType::OperatingIncome,
            LineType::OperatingExpense,
            LineType::OtherIncome,
            LineType::OtherExpense,
        ] {
            let buckets = TableKind::ALL.iter().filter(|k| k.accepts(lt)).count();
            assert_eq!(buckets, 1, "{lt} should land in exactly one table");
        }
        // COGS and Unclassified land nowhere.
        assert!(!TableKind::ALL.iter().any(|k| k.accepts(LineType::Cogs)));
        assert!(!TableKind::ALL
            .iter()
            .any(|k| k.accepts(LineType::Unclassified)));
    }

    #[test]
    fn test_monthly_totals() {
        let table = MonthlyTable {
            kind: TableKind::Sales,
            records: vec![
                CanonicalRecord {
                    account: "Consulting".to_string(),
                    month: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    amount: 1000.0,
                    line_type: LineType::OperatingIncome,
                },
                CanonicalRecord {
                    account: "Licensing".to_string(),
                    month: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    amount: 250.0,
                    line_type: LineType::OperatingIncome,
                },
            ],
        };
        let totals = table.monthly_totals();
        assert_eq!(
            totals.get(&NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            Some(&1250.0)
        );
    }
}
