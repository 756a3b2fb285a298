use crate::cashflow::extract_cash_flow;
use crate::error::{NormalizerError, Result};
use crate::header::{locate_header, normalize_sheet, HeaderHeuristics};
use crate::reshape::reshape;
use crate::schema::{Cell, NormalizedSheet, ParsedWorkbook, RawSheet, RawWorkbook};
use crate::utils::excel_serial_to_date;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

/// The sheet holding the QuickBooks Statement of Cash Flows, matched by exact
/// name.
const CASH_FLOW_SHEET: &str = "Cash flow";

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn sheets_from_reader<RS: Read + Seek>(workbook: &mut calamine::Sheets<RS>) -> Result<RawWorkbook> {
    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(NormalizerError::EmptyWorkbook);
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        sheets.push(RawSheet::new(name, rows));
    }
    Ok(RawWorkbook { sheets })
}

/// Loads every sheet of a workbook file into untyped cell grids.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<RawWorkbook> {
    let mut workbook = open_workbook_auto(path.as_ref())?;
    sheets_from_reader(&mut workbook)
}

/// Loads a workbook from an in-memory reader, e.g. bytes already fetched
/// over HTTP by the caller.
pub fn load_workbook_from_reader<RS: Read + Seek + Clone>(reader: RS) -> Result<RawWorkbook> {
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    sheets_from_reader(&mut workbook)
}

/// A sheet is the month-over-month P&L when QuickBooks named it "MOM PL" or
/// when its identifier header gives it away.
fn is_pnl_sheet(sheet: &NormalizedSheet) -> bool {
    sheet.name.eq_ignore_ascii_case("MOM PL")
        || sheet
            .columns
            .iter()
            .any(|c| c.to_lowercase().contains("distribution account"))
}

/// Runs the normalization pipeline over already-loaded grids with the default
/// QuickBooks heuristics.
pub fn parse_workbook(workbook: &RawWorkbook) -> Result<ParsedWorkbook> {
    parse_workbook_with(workbook, &HeaderHeuristics::default())
}

/// Per sheet: locate the header row, normalize, then route the P&L sheet
/// through the reshaper and the "Cash flow" sheet through the section
/// extractor. Sheets where no header is found are skipped silently (a
/// workbook may contain non-tabular sheets by design); a malformed cash-flow
/// sheet is surfaced and skipped without failing the other sheets.
pub fn parse_workbook_with(
    workbook: &RawWorkbook,
    heuristics: &HeaderHeuristics,
) -> Result<ParsedWorkbook> {
    info!("Parsing workbook with {} sheets", workbook.sheets.len());

    let mut sheets = BTreeMap::new();
    for raw in &workbook.sheets {
        match locate_header(raw, heuristics) {
            Some(header) => {
                let normalized = normalize_sheet(raw, &header);
                sheets.insert(raw.name.clone(), normalized);
            }
            None => {
                debug!("No header row found in sheet '{}'; skipping", raw.name);
            }
        }
    }

    let monthly = sheets
        .values()
        .find(|s| is_pnl_sheet(s))
        .map(|pnl| {
            info!("Reshaping P&L sheet '{}'", pnl.name);
            reshape(pnl)
        })
        .unwrap_or_default();

    let cash_flow = match sheets.get(CASH_FLOW_SHEET) {
        Some(sheet) => match extract_cash_flow(sheet) {
            Ok(summary) => Some(summary),
            Err(e @ NormalizerError::CashFlowShape(_)) => {
                warn!("Skipping malformed cash flow sheet: {e}");
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    Ok(ParsedWorkbook {
        sheets,
        monthly,
        cash_flow,
    })
}
