use crate::utils::{add_months, first_of_month};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A projected series together with the fitted rate: slope per day for the
/// linear engine, monthly growth fraction for the compounding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub projected: BTreeMap<NaiveDate, f64>,
    pub rate: f64,
}

/// Ordinary least squares over date ordinals. Needs at least three history
/// points; shorter series produce no forecast.
pub fn linear_forecast(
    history: &BTreeMap<NaiveDate, f64>,
    months_ahead: u32,
) -> Option<Forecast> {
    if history.len() < 3 {
        debug!(
            "linear forecast skipped: {} history points (need 3)",
            history.len()
        );
        return None;
    }

    let n = history.len() as f64;
    let xs: Vec<f64> = history.keys().map(|d| d.num_days_from_ce() as f64).collect();
    let ys: Vec<f64> = history.values().copied().collect();

    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let ss_xy: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let ss_xx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if ss_xx == 0.0 {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let last_month = first_of_month(*history.keys().next_back()?);
    let mut projected = BTreeMap::new();
    for offset in 1..=months_ahead {
        let month = add_months(last_month, offset);
        let x = month.num_days_from_ce() as f64;
        projected.insert(month, slope * x + intercept);
    }

    Some(Forecast {
        projected,
        rate: slope,
    })
}

/// Compounds the average month-over-month growth of the trailing six points.
/// Growth is clamped to +/-20% per month so one outlier month cannot send
/// the projection vertical.
pub fn growth_forecast(
    history: &BTreeMap<NaiveDate, f64>,
    months_ahead: u32,
) -> Option<Forecast> {
    if history.len() < 3 {
        return None;
    }

    let values: Vec<f64> = history.values().copied().collect();
    let recent = &values[values.len().saturating_sub(6)..];

    let mut rates = Vec::new();
    for pair in recent.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev != 0.0 {
            rates.push((next - prev) / prev);
        }
    }
    let mut rate = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };
    if !rate.is_finite() {
        rate = 0.0;
    }
    rate = rate.clamp(-0.20, 0.20);

    let last_month = first_of_month(*history.keys().next_back()?);
    let mut level = *values.last()?;
    let mut projected = BTreeMap::new();
    for offset in 1..=months_ahead {
        level *= 1.0 + rate;
        projected.insert(add_months(last_month, offset), level);
    }

    Some(Forecast {
        projected,
        rate,
    })
}
