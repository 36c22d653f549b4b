//! Descriptive statistics over cycle lengths.
//!
//! Every function returns `None` when its sample-count precondition is not
//! met. "No data" is an expected state for new users, not an error.

use std::collections::HashMap;

/// Mean rounded half away from zero to a whole number of days
pub fn rounded_average(lengths: &[i64]) -> Option<i64> {
    mean_exact(lengths).map(|m| m.round() as i64)
}

/// Rounded mean of the last `window` lengths
pub fn rolling_average(lengths: &[i64], window: usize) -> Option<i64> {
    let start = lengths.len().saturating_sub(window);
    rounded_average(&lengths[start..])
}

pub fn minimum(lengths: &[i64]) -> Option<i64> {
    lengths.iter().copied().min()
}

pub fn maximum(lengths: &[i64]) -> Option<i64> {
    lengths.iter().copied().max()
}

/// Arithmetic mean, one decimal place
pub fn mean(lengths: &[i64]) -> Option<f64> {
    mean_exact(lengths).map(|m| round_to(m, 1))
}

/// Median; even-sized samples average the two middle values
pub fn median(lengths: &[i64]) -> Option<f64> {
    if lengths.is_empty() {
        return None;
    }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) as f64 / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Most frequent length.
///
/// `None` unless exactly one length has the highest count and there is more
/// than one sample to compare.
pub fn mode(lengths: &[i64]) -> Option<i64> {
    if lengths.len() < 2 {
        return None;
    }

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &length in lengths {
        *counts.entry(length).or_insert(0) += 1;
    }

    let best = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|&(_, &c)| c == best);
    let (&value, _) = leaders.next()?;
    if leaders.next().is_some() {
        tracing::debug!("No unique mode among {} cycle lengths", lengths.len());
        return None;
    }
    Some(value)
}

/// Sample standard deviation (n - 1 denominator), three decimal places
pub fn standard_deviation(lengths: &[i64]) -> Option<f64> {
    if lengths.len() < 2 {
        return None;
    }
    let avg = mean_exact(lengths)?;
    let variance = lengths
        .iter()
        .map(|&l| (l as f64 - avg).powi(2))
        .sum::<f64>()
        / (lengths.len() - 1) as f64;
    Some(round_to(variance.sqrt(), 3))
}

fn mean_exact(lengths: &[i64]) -> Option<f64> {
    if lengths.is_empty() {
        return None;
    }
    Some(lengths.iter().sum::<i64>() as f64 / lengths.len() as f64)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
