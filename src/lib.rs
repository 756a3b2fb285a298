//! # Statement Normalizer
//!
//! A library for turning exported accounting workbooks (QuickBooks-style
//! xlsx) into normalized tables and reconstructed financial statements.
//!
//! ## Core Concepts
//!
//! - **Raw Sheet**: The cell grid exactly as it sits in the workbook,
//!   including title banners and blank padding rows
//! - **Header Detection**: A scored scan that finds the real header row
//!   inside the decorative preamble
//! - **Section Classification**: A state machine over profit-and-loss row
//!   labels that assigns each account to its statement section
//! - **Canonical Records**: The wide month-per-column layout unpivoted into
//!   one (account, month, amount, line type) record per cell
//! - **Degrade, Don't Fail**: Malformed individual sheets are skipped with a
//!   log line; only unreadable workbooks abort the pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_normalizer::*;
//!
//! let parsed = load_and_parse("exports/company_2025.xlsx")?;
//!
//! for table in &parsed.monthly {
//!     println!("{}: {} records", table.kind.sheet_name(), table.records.len());
//! }
//!
//! if let Some(cash_flow) = &parsed.cash_flow {
//!     println!("net cash change: {}", cash_flow.net_cash_change);
//! }
//!
//! let profit = analyze_profit(&parsed);
//! println!("YTD net profit: {}", profit.metrics.ytd_net_profit);
//! ```

pub mod analysis;
pub mod cache;
pub mod cashflow;
pub mod classifier;
pub mod error;
pub mod forecast;
pub mod header;
pub mod ingest;
pub mod matcher;
pub mod months;
pub mod reshape;
pub mod schema;
pub mod utils;

pub use analysis::{
    analyze_ap, analyze_ar, analyze_cash, analyze_overview, analyze_profit, analyze_sales,
    analyze_spending, classify_aging, ApAnalysis, ArAnalysis, CashAnalysis, MonthlyPnl, Overview,
    ProfitAnalysis, ProfitMetrics, SalesAnalysis, SpendingAnalysis,
};
pub use cache::{content_key, AnalysisCache};
pub use cashflow::extract_cash_flow;
pub use classifier::{classify_rows, MainSection, SectionState, SubSection};
pub use error::{NormalizerError, Result};
pub use forecast::{growth_forecast, linear_forecast, Forecast};
pub use header::{clean_column_names, locate_header, normalize_sheet, BonusRule, HeaderHeuristics};
pub use ingest::{
    load_workbook, load_workbook_from_reader, parse_workbook, parse_workbook_with,
};
pub use matcher::{find_column, find_sheet, ColumnRole};
pub use months::parse_month_label;
pub use reshape::reshape;
pub use schema::*;
pub use utils::*;

use log::info;
use std::path::Path;

/// Reads a workbook from disk and runs the full normalization pipeline.
pub fn load_and_parse<P: AsRef<Path>>(path: P) -> Result<ParsedWorkbook> {
    let path = path.as_ref();
    info!("Loading workbook from {}", path.display());

    let raw = load_workbook(path)?;
    let parsed = parse_workbook(&raw)?;

    info!(
        "Parsed {} sheets, {} monthly records, cash flow: {}",
        parsed.sheets.len(),
        parsed
            .monthly
            .iter()
            .map(|t| t.records.len())
            .sum::<usize>(),
        parsed.cash_flow.is_some()
    );
    Ok(parsed)
}
