use chrono::{Datelike, NaiveDate};

/// Truncates a date to the first day of its calendar month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Moves a date forward by whole months, clamping to the first of the target
/// month (callers in this crate only ever work at month granularity).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.month0() + months;
    let year = date.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Converts an Excel serial date to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

/// Cleans a raw amount string per the QuickBooks export conventions: strip
/// `$` and `,`, treat a parenthesized value as negative. Returns None when
/// nothing numeric remains; callers decide whether that coerces to 0 or drops
/// the record.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('$', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_of_month() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 18).unwrap();
        assert_eq!(
            first_of_month(date),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_add_months_year_rollover() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(
            add_months(date, 3),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert_eq!(
            add_months(date, 1),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0),
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
    }

    #[test]
    fn test_clean_amount() {
        assert_eq!(clean_amount("1,234.56"), Some(1234.56));
        assert_eq!(clean_amount("$1,234.56"), Some(1234.56));
        assert_eq!(clean_amount("  -42.50  "), Some(-42.5));
        assert_eq!(clean_amount("0"), Some(0.0));
        assert_eq!(clean_amount("not_a_number"), None);
        assert_eq!(clean_amount(""), None);
    }

    #[test]
    fn test_clean_amount_parenthesized_negatives() {
        assert_eq!(clean_amount("(500.00)"), Some(-500.0));
        assert_eq!(clean_amount("($1,234.56)"), Some(-1234.56));
    }
}
