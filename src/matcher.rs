use crate::schema::NormalizedSheet;
use std::collections::BTreeMap;

/// Column roles the aggregation layer looks up. Real exports rarely use the
/// canonical header verbatim, so each role carries a list of known aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    Amount,
    Description,
    Vendor,
    Customer,
    Revenue,
    Balance,
    Inflow,
    Outflow,
    Total,
    Product,
    Month,
}

impl ColumnRole {
    fn canonical(&self) -> &'static str {
        match self {
            ColumnRole::Date => "Date",
            ColumnRole::Amount => "Amount",
            ColumnRole::Description => "Description",
            ColumnRole::Vendor => "Vendor",
            ColumnRole::Customer => "Customer",
            ColumnRole::Revenue => "Revenue",
            ColumnRole::Balance => "Balance",
            ColumnRole::Inflow => "Inflow",
            ColumnRole::Outflow => "Outflow",
            ColumnRole::Total => "Total",
            ColumnRole::Product => "Product",
            ColumnRole::Month => "Month",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::Date => &["date", "day", "time", "transaction date", "inv date", "bill date"],
            ColumnRole::Amount => &[
                "amount", "amt", "value", "total", "balance", "cost", "debit", "credit", "revenue",
            ],
            ColumnRole::Description => &["description", "desc", "memo", "details", "name", "account"],
            ColumnRole::Vendor => &["vendor", "supplier", "payee", "name"],
            ColumnRole::Customer => &["customer", "client", "bill to", "name"],
            ColumnRole::Revenue => &["revenue", "sales", "income", "credit"],
            ColumnRole::Balance => &["balance", "total", "net"],
            ColumnRole::Inflow => &["inflow", "deposit", "credit"],
            ColumnRole::Outflow => &["outflow", "withdrawal", "debit"],
            ColumnRole::Total => &["total"],
            ColumnRole::Product => &["product", "account", "item"],
            ColumnRole::Month => &["month", "date", "period"],
        }
    }
}

/// Finds the sheet column filling a role: exact header match first, then
/// case-insensitive, then alias, then alias-as-substring. Returns the column
/// index, or None when nothing plausibly matches.
pub fn find_column(sheet: &NormalizedSheet, role: ColumnRole) -> Option<usize> {
    let target = role.canonical();
    if let Some(idx) = sheet.columns.iter().position(|c| c == target) {
        return Some(idx);
    }

    let lower: Vec<String> = sheet.columns.iter().map(|c| c.to_lowercase()).collect();
    if let Some(idx) = lower.iter().position(|c| c == &target.to_lowercase()) {
        return Some(idx);
    }

    for alias in role.aliases() {
        if let Some(idx) = lower.iter().position(|c| c == alias) {
            return Some(idx);
        }
    }
    for alias in role.aliases() {
        if let Some(idx) = lower.iter().position(|c| c.contains(alias)) {
            return Some(idx);
        }
    }
    None
}

const SHEET_ALIASES: &[(&str, &[&str])] = &[
    ("GL", &["general ledger", "journal", "transactions", "data"]),
    ("AR", &["accounts receivable", "receivables", "invoices", "open invoices"]),
    ("AP", &["accounts payable", "payables", "bills"]),
    ("Cash", &["cash flow", "bank", "banking", "treasury"]),
    ("Sales_Monthly", &["sales", "revenue", "income"]),
    ("Expenses_Monthly", &["expenses", "costs", "expenditure"]),
];

/// Fuzzy sheet lookup: exact name, case-insensitive name, alias, then alias
/// as a substring of the sheet name.
pub fn find_sheet<'a>(
    sheets: &'a BTreeMap<String, NormalizedSheet>,
    target: &str,
) -> Option<&'a NormalizedSheet> {
    if let Some(sheet) = sheets.get(target) {
        return Some(sheet);
    }

    let target_lower = target.to_lowercase();
    if let Some(sheet) = sheets
        .iter()
        .find(|(name, _)| name.to_lowercase() == target_lower)
        .map(|(_, s)| s)
    {
        return Some(sheet);
    }

    let aliases = SHEET_ALIASES
        .iter()
        .find(|(name, _)| *name == target)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[]);

    for alias in aliases {
        if let Some(sheet) = sheets
            .iter()
            .find(|(name, _)| name.to_lowercase() == *alias)
            .map(|(_, s)| s)
        {
            return Some(sheet);
        }
    }
    for alias in aliases {
        if let Some(sheet) = sheets
            .iter()
            .find(|(name, _)| name.to_lowercase().contains(alias))
            .map(|(_, s)| s)
        {
            return Some(sheet);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, columns: &[&str]) -> NormalizedSheet {
        NormalizedSheet {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_find_column_exact_beats_alias() {
        let s = sheet("AR", &["Customer", "Total", "Current"]);
        assert_eq!(find_column(&s, ColumnRole::Customer), Some(0));
        assert_eq!(find_column(&s, ColumnRole::Total), Some(1));
    }

    #[test]
    fn test_find_column_via_alias() {
        let s = sheet("AP", &["Supplier", "Open balance"]);
        assert_eq!(find_column(&s, ColumnRole::Vendor), Some(0));
        assert_eq!(find_column(&s, ColumnRole::Amount), Some(1));
    }

    #[test]
    fn test_find_column_none() {
        let s = sheet("X", &["Foo", "Bar"]);
        assert_eq!(find_column(&s, ColumnRole::Date), None);
    }

    #[test]
    fn test_find_sheet_by_alias() {
        let mut sheets = BTreeMap::new();
        sheets.insert("Open Invoices".to_string(), sheet("Open Invoices", &[]));
        assert!(find_sheet(&sheets, "AR").is_some());
        assert!(find_sheet(&sheets, "AP").is_none());
    }

    #[test]
    fn test_find_sheet_case_insensitive() {
        let mut sheets = BTreeMap::new();
        sheets.insert("sales_monthly".to_string(), sheet("sales_monthly", &[]));
        assert!(find_sheet(&sheets, "Sales_Monthly").is_some());
    }
}
