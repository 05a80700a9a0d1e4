//! Field acceptance rules and the per-category price filter.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::extract::{
    extract_first_paragraph, extract_json_object, extract_last_number, extract_last_url,
};
use crate::record::{Field, Record, parse_decimal};

/// Inclusive accepted price interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    /// Lowest accepted price.
    pub low: f64,
    /// Highest accepted price.
    pub high: f64,
}

impl PriceBand {
    /// Creates a band accepting `low..=high`.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Returns `true` if `price` lies inside the band.
    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        (self.low..=self.high).contains(&price)
    }
}

/// Category-specific price ranges.
///
/// Categories without a band are accepted unless a catch-all band is set,
/// in which case it applies to every category.
#[derive(Debug, Clone, Default)]
pub struct PriceFilter {
    bands: HashMap<String, PriceBand>,
    catch_all: Option<PriceBand>,
}

impl PriceFilter {
    /// Creates a filter accepting every price.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the accepted range for one category.
    #[must_use]
    pub fn with_band(mut self, category: impl Into<String>, low: f64, high: f64) -> Self {
        self.bands.insert(category.into(), PriceBand::new(low, high));
        self
    }

    /// Applies one range to every category.
    #[must_use]
    pub const fn with_catch_all(mut self, low: f64, high: f64) -> Self {
        self.catch_all = Some(PriceBand::new(low, high));
        self
    }

    /// Band governing `category`, if any.
    #[must_use]
    pub fn band_for(&self, category: &str) -> Option<PriceBand> {
        self.catch_all.or_else(|| self.bands.get(category).copied())
    }

    /// Returns `true` if `price` is acceptable for `category`.
    #[must_use]
    pub fn accepts(&self, category: &str, price: f64) -> bool {
        self.band_for(category).is_none_or(|band| band.contains(price))
    }
}

/// First rule a record failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    /// No paragraph could be extracted.
    #[error("missing description")]
    MissingDescription,
    /// No number could be extracted for the price.
    #[error("missing price")]
    MissingPrice,
    /// No number could be extracted for a dimension axis.
    #[error("missing {0}")]
    MissingDimension(Field),
    /// A dimension axis is zero.
    #[error("zero dimension")]
    ZeroDimension,
    /// No non-empty JSON object could be extracted.
    #[error("missing technical specs")]
    MissingSpecs,
    /// No URL could be extracted.
    #[error("missing technical doc")]
    MissingDoc,
    /// Price is not a number.
    #[error("price '{0}' is not a number")]
    UnparsablePrice(String),
    /// Price lies outside the category band.
    #[error("price {price} outside accepted range for '{category}'")]
    PriceOutOfRange {
        /// Rejected price.
        price: f64,
        /// Record category.
        category: String,
    },
}

/// Runs every field through its extractor in place, then checks acceptance.
///
/// A price rejected by the filter is cleared so the next attempt queries it
/// again.
pub fn validate(record: &mut Record, filter: &PriceFilter) -> Result<(), Rejection> {
    record.description = record.description.as_deref().and_then(extract_first_paragraph);
    record.price = record.price.as_deref().and_then(extract_last_number);
    for axis in &mut record.dimensions.0 {
        *axis = axis.as_deref().and_then(extract_last_number);
    }
    record.technical_specs = extract_json_object(&record.technical_specs).map_or(Value::Null, Value::Object);
    record.technical_doc = record.technical_doc.as_deref().and_then(extract_last_url);

    if record.description.is_none() {
        return Err(Rejection::MissingDescription);
    }
    let Some(price_text) = record.price.clone() else {
        return Err(Rejection::MissingPrice);
    };
    if let Some(index) = record.dimensions.0.iter().position(Option::is_none) {
        return Err(Rejection::MissingDimension(Field::AXES[index]));
    }
    if record.dimensions.has_zero() {
        return Err(Rejection::ZeroDimension);
    }
    if record.technical_specs.is_null() {
        return Err(Rejection::MissingSpecs);
    }
    if record.technical_doc.is_none() {
        return Err(Rejection::MissingDoc);
    }

    let Some(price) = parse_decimal(&price_text) else {
        record.price = None;
        return Err(Rejection::UnparsablePrice(price_text));
    };
    if !filter.accepts(record.category(), price) {
        record.price = None;
        return Err(Rejection::PriceOutOfRange {
            price,
            category: record.category().to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Dimensions;

    fn complete_record(category: &str) -> Record {
        let mut record = Record::new("3", "Fender Precision Bass", "Basse", "Precision", category);
        record.description = Some(
            "## Présentation\n\nLa **Fender Precision Bass** est la basse électrique de référence depuis 1951.[1]"
                .into(),
        );
        record.price = Some("Entre 900 et 1100 €, prix conseillé **1299**".into());
        record.dimensions = Dimensions::new("116 cm", "4,5 cm", "33", "**4.1** kg");
        record.technical_specs = Value::String("```json\n{\"cordes\": 4, \"frettes\": 20}\n```".into());
        record.technical_doc = Some("Manuel: https://www.fender.com/manual.pdf[2]".into());
        record
    }

    #[test]
    fn test_complete_record_is_extracted_and_accepted() {
        let filter = PriceFilter::new().with_band("Basses Electriques", 400.0, 10000.0);
        let mut record = complete_record("Basses Electriques");

        assert_eq!(validate(&mut record, &filter), Ok(()));
        assert_eq!(record.price.as_deref(), Some("1299"));
        assert_eq!(record.dimensions.values(), Some(["116", "4,5", "33", "4.1"]));
        assert_eq!(record.technical_specs["cordes"], 4);
        assert_eq!(record.technical_doc.as_deref(), Some("https://www.fender.com/manual.pdf"));
    }

    #[test]
    fn test_zero_dimension_always_rejected() {
        let filter = PriceFilter::new();
        let mut record = complete_record("Basses Electriques");
        record.dimensions = Dimensions::new("45", "0", "30", "5");

        assert_eq!(validate(&mut record, &filter), Err(Rejection::ZeroDimension));
    }

    #[test]
    fn test_price_out_of_band_is_cleared() {
        let filter = PriceFilter::new().with_band("Basses Electriques", 400.0, 1000.0);
        let mut record = complete_record("Basses Electriques");

        let rejection = validate(&mut record, &filter).unwrap_err();

        assert!(matches!(rejection, Rejection::PriceOutOfRange { .. }));
        assert_eq!(record.price, None);
    }

    #[test]
    fn test_unknown_category_accepted_unless_catch_all() {
        let banded = PriceFilter::new().with_band("Cymbales", 59.0, 1900.0);
        assert!(banded.accepts("Inconnue", 1_000_000.0));
        assert!(!banded.accepts("Cymbales", 20.0));
        assert!(banded.accepts("Cymbales", 59.0));

        let catch_all = PriceFilter::new().with_catch_all(80.0, 1900.0);
        assert!(!catch_all.accepts("Microphones", 50.0));
        assert!(catch_all.accepts("Micros studio", 150.0));
    }

    #[test]
    fn test_missing_fields_rejected_in_order() {
        let filter = PriceFilter::new();

        let mut record = complete_record("X");
        record.description = Some("trop court".into());
        assert_eq!(validate(&mut record, &filter), Err(Rejection::MissingDescription));

        let mut record = complete_record("X");
        record.dimensions.0[3] = Some("inconnu".into());
        assert_eq!(validate(&mut record, &filter), Err(Rejection::MissingDimension(Field::Weight)));

        let mut record = complete_record("X");
        record.technical_specs = Value::String("```json\n{}\n```".into());
        assert_eq!(validate(&mut record, &filter), Err(Rejection::MissingSpecs));

        let mut record = complete_record("X");
        record.technical_doc = Some("aucun lien".into());
        assert_eq!(validate(&mut record, &filter), Err(Rejection::MissingDoc));
    }
}
