//! Confidence scoring against the run's own price and dimension history.
//!
//! The score is an anomaly heuristic, not a truth check: a record whose price
//! or size diverges sharply from the records accepted before it in the same
//! ledger loses points.

use crate::record::{Dimensions, parse_decimal};

const MAX_SCORE: f64 = 100.0;

const PRICE_SOFT_LIMIT: f64 = 200.0;
const PRICE_HARD_LIMIT: f64 = 300.0;
const PRICE_SLOPE: f64 = 0.5;
const PRICE_FLAT_PENALTY: f64 = 50.0;

const DIMENSION_SOFT_LIMIT: f64 = 20.0;
const DIMENSION_HARD_LIMIT: f64 = 120.0;
const DIMENSION_SLOPE: f64 = 0.25 * 0.5;
const DIMENSION_FLAT_PENALTY: f64 = 12.5;
const ZERO_DIMENSION_PENALTY: f64 = 50.0;

/// Computes the confidence score of an accepted record.
///
/// Starts at 100 and subtracts a price penalty and per-axis dimension
/// penalties, each measured as the percentage deviation from the mean of the
/// cached population. Empty caches skip their penalty. The result is clamped
/// to `[0, 100]` and rounded to two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence_score(
    price: Option<&str>,
    dimensions: &Dimensions,
    cached_prices: &[f64],
    cached_dimensions: &[[f64; 4]],
) -> f64 {
    let mut score = MAX_SCORE;

    if let Some(price) = price.and_then(parse_decimal) {
        score -= price_penalty(price, cached_prices);
    }

    if dimensions.has_zero() {
        score -= ZERO_DIMENSION_PENALTY;
    } else if !cached_dimensions.is_empty() {
        for (axis, value) in dimensions.0.iter().enumerate() {
            let Some(value) = value.as_deref().and_then(clean_dimension) else {
                continue;
            };
            let mean = cached_dimensions.iter().map(|dims| dims[axis]).sum::<f64>()
                / cached_dimensions.len() as f64;
            score -= dimension_penalty(deviation_percent(value, mean));
        }
    }

    (score.clamp(0.0, MAX_SCORE) * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn price_penalty(price: f64, cached_prices: &[f64]) -> f64 {
    if cached_prices.is_empty() {
        return 0.0;
    }
    let mean = cached_prices.iter().sum::<f64>() / cached_prices.len() as f64;
    let diff = deviation_percent(price, mean);

    if diff > PRICE_HARD_LIMIT {
        PRICE_FLAT_PENALTY
    } else if diff > PRICE_SOFT_LIMIT {
        (diff - PRICE_SOFT_LIMIT) * PRICE_SLOPE
    } else {
        0.0
    }
}

fn dimension_penalty(diff: f64) -> f64 {
    if diff > DIMENSION_HARD_LIMIT {
        DIMENSION_FLAT_PENALTY
    } else if diff > DIMENSION_SOFT_LIMIT {
        (diff - DIMENSION_SOFT_LIMIT) * DIMENSION_SLOPE
    } else {
        0.0
    }
}

fn deviation_percent(value: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    (value - mean).abs() / mean * 100.0
}

fn clean_dimension(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    parse_decimal(&cleaned)
}
