use crate::matcher::{find_column, find_sheet, ColumnRole};
use crate::schema::{
    AgingBucket, Cell, MonthlyTable, NormalizedSheet, ParsedWorkbook, TableKind,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Maps an AR/AP column header to its aging bucket. Closed classification:
/// headers that fit no known bucket come back as `Unrecognized` instead of
/// being silently skipped.
pub fn classify_aging(header: &str) -> AgingBucket {
    let lower = header.to_lowercase().replace(' ', "");
    if lower.contains("current") {
        AgingBucket::Current
    } else if lower.contains("1-30") {
        AgingBucket::Days1To30
    } else if lower.contains("31-60") {
        AgingBucket::Days31To60
    } else if lower.contains("61-90") {
        AgingBucket::Days61To90
    } else if lower.contains("91") || lower.contains("over90") {
        AgingBucket::Over90
    } else {
        AgingBucket::Unrecognized(header.to_string())
    }
}

fn by_amount_desc(a: &f64, b: &f64) -> Ordering {
    b.partial_cmp(a).unwrap_or(Ordering::Equal)
}

/// The identifier column for AR/AP detail sheets: the role match when one
/// exists, else the first placeholder column (QuickBooks leaves the entity
/// column unlabeled), else column 0.
fn entity_column(sheet: &NormalizedSheet, role: ColumnRole) -> usize {
    find_column(sheet, role)
        .or_else(|| sheet.columns.iter().position(|c| c.starts_with("Unnamed_")))
        .unwrap_or(0)
}

fn amount_column(sheet: &NormalizedSheet) -> Option<usize> {
    find_column(sheet, ColumnRole::Total).or_else(|| find_column(sheet, ColumnRole::Amount))
}

/// Data rows excluding "Total" summary rows, by entity-column text.
fn data_rows<'a>(sheet: &'a NormalizedSheet, entity_col: usize) -> Vec<&'a Vec<Cell>> {
    sheet
        .rows
        .iter()
        .filter(|row| {
            let text = row.get(entity_col).map(|c| c.as_text()).unwrap_or_default();
            !text.to_lowercase().contains("total")
        })
        .collect()
}

fn column_sum(rows: &[&Vec<Cell>], col: usize) -> f64 {
    rows.iter()
        .filter_map(|r| r.get(col).and_then(|c| c.as_number()))
        .sum()
}

// ---------------------------------------------------------------------------
// Sales trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesAnalysis {
    pub by_product: BTreeMap<String, f64>,
    pub trend: BTreeMap<NaiveDate, f64>,
    /// Product rows x month columns, missing cells filled with 0.
    pub product_monthly: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    /// Month-over-month growth percentages; the first month is always 0.
    pub product_mom_growth: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

pub fn analyze_sales(table: &MonthlyTable) -> SalesAnalysis {
    let by_product = table.account_totals();
    let trend = table.monthly_totals();

    let all_months: Vec<NaiveDate> = trend.keys().copied().collect();

    let mut product_monthly: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for record in &table.records {
        *product_monthly
            .entry(record.account.clone())
            .or_default()
            .entry(record.month)
            .or_insert(0.0) += record.amount;
    }
    for series in product_monthly.values_mut() {
        for month in &all_months {
            series.entry(*month).or_insert(0.0);
        }
    }

    let mut product_mom_growth: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for (product, series) in &product_monthly {
        let mut growth = BTreeMap::new();
        let mut prev: Option<f64> = None;
        for (month, value) in series {
            let pct = match prev {
                None => 0.0,
                Some(p) => {
                    // Zero prior months divide by 1 to avoid infinities.
                    let base = if p == 0.0 { 1.0 } else { p };
                    (value - p) / base * 100.0
                }
            };
            growth.insert(*month, pct);
            prev = Some(*value);
        }
        product_mom_growth.insert(product.clone(), growth);
    }

    SalesAnalysis {
        by_product,
        trend,
        product_monthly,
        product_mom_growth,
    }
}

// ---------------------------------------------------------------------------
// AR collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArAnalysis {
    pub aging_table: Vec<(AgingBucket, f64)>,
    /// Top customers by open balance, descending.
    pub details: Vec<(String, f64)>,
    pub total_ar: f64,
}

pub fn analyze_ar(sheet: &NormalizedSheet) -> ArAnalysis {
    let cust_col = entity_column(sheet, ColumnRole::Customer);
    let rows = data_rows(sheet, cust_col);
    let amt_col = amount_column(sheet);

    let mut aging_table = Vec::new();
    for (idx, column) in sheet.columns.iter().enumerate() {
        if Some(idx) == amt_col || idx == cust_col {
            continue;
        }
        let bucket = classify_aging(column);
        if !matches!(bucket, AgingBucket::Unrecognized(_)) {
            aging_table.push((bucket, column_sum(&rows, idx)));
        }
    }

    let mut details: Vec<(String, f64)> = Vec::new();
    if let Some(amt) = amt_col {
        details = rows
            .iter()
            .filter_map(|r| {
                let name = r.get(cust_col).map(|c| c.as_text())?;
                let amount = r.get(amt).and_then(|c| c.as_number())?;
                (!name.is_empty()).then_some((name, amount))
            })
            .collect();
        details.sort_by(|a, b| by_amount_desc(&a.1, &b.1));
        details.truncate(10);
    }

    ArAnalysis {
        aging_table,
        details,
        total_ar: amt_col.map(|c| column_sum(&rows, c)).unwrap_or(0.0),
    }
}

// ---------------------------------------------------------------------------
// AP management
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApAnalysis {
    pub total_open: f64,
    /// Current plus 1-30 bucket: due within roughly a month.
    pub upcoming_30d: f64,
    pub vendors: Vec<(String, f64)>,
}

pub fn analyze_ap(sheet: &NormalizedSheet) -> ApAnalysis {
    let vend_col = entity_column(sheet, ColumnRole::Vendor);
    let rows = data_rows(sheet, vend_col);
    let amt_col = amount_column(sheet);

    let total_open = amt_col.map(|c| column_sum(&rows, c)).unwrap_or(0.0);

    let upcoming_30d: f64 = sheet
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, column)| {
            Some(*idx) != amt_col
                && matches!(
                    classify_aging(column),
                    AgingBucket::Current | AgingBucket::Days1To30
                )
        })
        .map(|(idx, _)| column_sum(&rows, idx))
        .sum();

    let mut vendors: Vec<(String, f64)> = Vec::new();
    if let Some(amt) = amt_col {
        let mut grouped: BTreeMap<String, f64> = BTreeMap::new();
        for row in &rows {
            let name = row.get(vend_col).map(|c| c.as_text()).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let amount = row.get(amt).and_then(|c| c.as_number()).unwrap_or(0.0);
            *grouped.entry(name).or_insert(0.0) += amount;
        }
        vendors = grouped.into_iter().collect();
        vendors.sort_by(|a, b| by_amount_desc(&a.1, &b.1));
        vendors.truncate(10);
    }

    ApAnalysis {
        total_open,
        upcoming_30d,
        vendors,
    }
}

// ---------------------------------------------------------------------------
// Cash position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashAnalysis {
    pub daily_trend: BTreeMap<NaiveDate, f64>,
    pub current_balance: f64,
    /// Average monthly outflow over the trailing 90 days.
    pub burn_rate_mo: f64,
    /// 999 when no burn is measurable.
    pub runway_months: f64,
}

impl Default for CashAnalysis {
    fn default() -> Self {
        Self {
            daily_trend: BTreeMap::new(),
            current_balance: 0.0,
            burn_rate_mo: 0.0,
            runway_months: 999.0,
        }
    }
}

pub fn analyze_cash(sheet: &NormalizedSheet) -> CashAnalysis {
    let (Some(date_col), Some(bal_col)) = (
        find_column(sheet, ColumnRole::Date),
        find_column(sheet, ColumnRole::Balance),
    ) else {
        return CashAnalysis::default();
    };
    let outflow_col = find_column(sheet, ColumnRole::Outflow);

    let mut daily_trend: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut latest: Option<(NaiveDate, f64)> = None;
    for row in &sheet.rows {
        let Some(date) = row.get(date_col).and_then(|c| c.as_date()) else {
            continue;
        };
        let balance = row.get(bal_col).and_then(|c| c.as_number()).unwrap_or(0.0);
        *daily_trend.entry(date).or_insert(0.0) += balance;
        if latest.map(|(d, _)| date >= d).unwrap_or(true) {
            latest = Some((date, balance));
        }
    }

    let Some((latest_date, current_balance)) = latest else {
        return CashAnalysis::default();
    };

    let burn_rate_mo = outflow_col
        .map(|col| {
            let cutoff = latest_date - Duration::days(90);
            let recent: f64 = sheet
                .rows
                .iter()
                .filter(|r| {
                    r.get(date_col)
                        .and_then(|c| c.as_date())
                        .map(|d| d > cutoff)
                        .unwrap_or(false)
                })
                .filter_map(|r| r.get(col).and_then(|c| c.as_number()))
                .sum();
            recent / 3.0
        })
        .unwrap_or(0.0);

    let runway_months = if burn_rate_mo > 0.0 {
        current_balance / burn_rate_mo
    } else {
        999.0
    };

    CashAnalysis {
        daily_trend,
        current_balance,
        burn_rate_mo,
        runway_months,
    }
}

// ---------------------------------------------------------------------------
// Profitability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPnl {
    pub month: NaiveDate,
    pub operating_income: f64,
    pub operating_expense: f64,
    pub net_operating_profit: f64,
    pub other_income: f64,
    pub other_expense: f64,
    pub net_profit: f64,
    /// Net profit as a percentage of operating income; 0 when income is 0.
    pub margin: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitMetrics {
    pub ytd_op_income: f64,
    pub ytd_op_expense: f64,
    pub ytd_net_op_profit: f64,
    pub ytd_other_income: f64,
    pub ytd_other_expense: f64,
    pub ytd_net_profit: f64,
    pub op_margin: f64,
    pub net_margin: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitAnalysis {
    pub monthly: Vec<MonthlyPnl>,
    pub metrics: ProfitMetrics,
}

fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub fn analyze_profit(workbook: &ParsedWorkbook) -> ProfitAnalysis {
    let totals = |kind: TableKind| -> BTreeMap<NaiveDate, f64> {
        workbook
            .table(kind)
            .map(|t| t.monthly_totals())
            .unwrap_or_default()
    };

    let op_inc = totals(TableKind::Sales);
    let op_exp = totals(TableKind::Expenses);
    let oth_inc = totals(TableKind::OtherIncome);
    let oth_exp = totals(TableKind::OtherExpenses);

    let mut all_months: Vec<NaiveDate> = op_inc
        .keys()
        .chain(op_exp.keys())
        .chain(oth_inc.keys())
        .chain(oth_exp.keys())
        .copied()
        .collect();
    all_months.sort();
    all_months.dedup();

    let mut monthly = Vec::with_capacity(all_months.len());
    for month in all_months {
        let operating_income = op_inc.get(&month).copied().unwrap_or(0.0);
        let operating_expense = op_exp.get(&month).copied().unwrap_or(0.0);
        let other_income = oth_inc.get(&month).copied().unwrap_or(0.0);
        let other_expense = oth_exp.get(&month).copied().unwrap_or(0.0);

        let net_operating_profit = operating_income - operating_expense;
        let net_profit = net_operating_profit + other_income - other_expense;

        monthly.push(MonthlyPnl {
            month,
            operating_income,
            operating_expense,
            net_operating_profit,
            other_income,
            other_expense,
            net_profit,
            margin: pct(net_profit, operating_income),
        });
    }

    let sum = |f: fn(&MonthlyPnl) -> f64| -> f64 { monthly.iter().map(f).sum() };
    let ytd_op_income = sum(|m| m.operating_income);
    let ytd_net_op_profit = sum(|m| m.net_operating_profit);
    let ytd_net_profit = sum(|m| m.net_profit);

    let metrics = ProfitMetrics {
        ytd_op_income,
        ytd_op_expense: sum(|m| m.operating_expense),
        ytd_net_op_profit,
        ytd_other_income: sum(|m| m.other_income),
        ytd_other_expense: sum(|m| m.other_expense),
        ytd_net_profit,
        op_margin: pct(ytd_net_op_profit, ytd_op_income),
        net_margin: pct(ytd_net_profit, ytd_op_income),
    };

    ProfitAnalysis { monthly, metrics }
}

// ---------------------------------------------------------------------------
// Spending
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendingAnalysis {
    pub monthly: BTreeMap<NaiveDate, f64>,
    pub top_5_ytd: Vec<(String, f64)>,
    pub top_5_trend: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

/// Combines operating and other expenses into one spending view.
pub fn analyze_spending(workbook: &ParsedWorkbook) -> SpendingAnalysis {
    let records: Vec<_> = [TableKind::Expenses, TableKind::OtherExpenses]
        .iter()
        .filter_map(|&k| workbook.table(k))
        .flat_map(|t| t.records.iter())
        .collect();

    let mut monthly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut by_account: BTreeMap<String, f64> = BTreeMap::new();
    for record in &records {
        *monthly.entry(record.month).or_insert(0.0) += record.amount;
        *by_account.entry(record.account.clone()).or_insert(0.0) += record.amount;
    }

    let mut top_5_ytd: Vec<(String, f64)> = by_account.into_iter().collect();
    top_5_ytd.sort_by(|a, b| by_amount_desc(&a.1, &b.1));
    top_5_ytd.truncate(5);

    let mut top_5_trend: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for record in &records {
        if top_5_ytd.iter().any(|(name, _)| name == &record.account) {
            *top_5_trend
                .entry(record.account.clone())
                .or_default()
                .entry(record.month)
                .or_insert(0.0) += record.amount;
        }
    }

    SpendingAnalysis {
        monthly,
        top_5_ytd,
        top_5_trend,
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub ytd_sales: f64,
    /// Operating plus other expenses.
    pub ytd_expense: f64,
    pub net_profit: f64,
    pub net_profit_margin: f64,
    pub total_ar: f64,
    pub total_ap: f64,
}

/// Aggregates the headline cards from the other modes. Missing sheets
/// degrade to zeros rather than failing the overview.
pub fn analyze_overview(workbook: &ParsedWorkbook) -> Overview {
    let profit = analyze_profit(workbook);
    let total_ar = find_sheet(&workbook.sheets, "AR")
        .map(|s| analyze_ar(s).total_ar)
        .unwrap_or(0.0);
    let total_ap = find_sheet(&workbook.sheets, "AP")
        .map(|s| analyze_ap(s).total_open)
        .unwrap_or(0.0);

    Overview {
        ytd_sales: profit.metrics.ytd_op_income,
        ytd_expense: profit.metrics.ytd_op_expense + profit.metrics.ytd_other_expense,
        net_profit: profit.metrics.ytd_net_profit,
        net_profit_margin: profit.metrics.net_margin,
        total_ar,
        total_ap,
    }
}
