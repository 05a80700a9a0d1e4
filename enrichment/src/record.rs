//! The catalog record under enrichment and its tabular row shape.

use serde_json::Value;
use std::fmt;

/// Column header of the output and error tables.
pub const OUTPUT_COLUMNS: [&str; 15] = [
    "id",
    "name",
    "type",
    "model",
    "description",
    "price",
    "length_cm",
    "height_cm",
    "width_cm",
    "weight_kg",
    "technical_specs",
    "technical_doc",
    "confidence_score",
    "llm2llm_score",
    "retries_number",
];

const MISSING: &str = "N/A";

/// An enrichable field of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Free-text product description.
    Description,
    /// Price as decimal text.
    Price,
    /// Length in centimetres.
    Length,
    /// Height in centimetres.
    Height,
    /// Width in centimetres.
    Width,
    /// Weight in kilograms.
    Weight,
    /// Structured technical specification.
    TechnicalSpecs,
    /// Technical documentation URL.
    TechnicalDoc,
}

impl Field {
    /// The four dimension axes, in query order.
    pub const AXES: [Self; 4] = [Self::Length, Self::Height, Self::Width, Self::Weight];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Description => "description",
            Self::Price => "price",
            Self::Length => "length",
            Self::Height => "height",
            Self::Width => "width",
            Self::Weight => "weight",
            Self::TechnicalSpecs => "technical specs",
            Self::TechnicalDoc => "technical doc",
        };
        f.write_str(name)
    }
}

/// Returns `true` if a text cell carries no usable value.
///
/// Empty text and the literal `nan` left behind by table exports both count
/// as unresolved.
#[must_use]
pub fn is_unresolved(value: Option<&str>) -> bool {
    value.is_none_or(|v| {
        let v = v.trim();
        v.is_empty() || v.eq_ignore_ascii_case("nan")
    })
}

/// Parses decimal text, accepting a comma as decimal separator.
#[must_use]
pub fn parse_decimal(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse::<f64>().ok()
}

/// Returns `true` if the text is a numeric zero (`0`, `0.0`, `0,0`).
#[must_use]
pub fn is_zero(value: &str) -> bool {
    parse_decimal(value).is_some_and(|v| v == 0.0)
}

/// Ordered length/height/width/weight tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimensions(pub [Option<String>; 4]);

impl Dimensions {
    /// Builds a tuple from four resolved values.
    #[must_use]
    pub fn new(length: &str, height: &str, width: &str, weight: &str) -> Self {
        Self([
            Some(length.to_string()),
            Some(height.to_string()),
            Some(width.to_string()),
            Some(weight.to_string()),
        ])
    }

    /// Returns `true` if any axis is zero.
    #[must_use]
    pub fn has_zero(&self) -> bool {
        self.0.iter().flatten().any(|v| is_zero(v))
    }

    /// Returns `true` if the tuple must be re-queried.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.0.iter().any(|v| is_unresolved(v.as_deref())) || self.has_zero()
    }

    /// Returns the four values when every axis is present.
    #[must_use]
    pub fn values(&self) -> Option<[&str; 4]> {
        let [a, b, c, d] = &self.0;
        Some([a.as_deref()?, b.as_deref()?, c.as_deref()?, d.as_deref()?])
    }

    /// Mutable access to the axis matching `field`.
    pub fn axis_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        let index = Field::AXES.iter().position(|axis| *axis == field)?;
        self.0.get_mut(index)
    }
}

/// One catalog item being enriched.
///
/// Identity and category are fixed at construction; the enrichable fields
/// are mutated in place by the resolver and validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    name: String,
    kind: String,
    model: String,
    category: String,
    /// Description text, raw answer until validated.
    pub description: Option<String>,
    /// Price text, raw answer until validated.
    pub price: Option<String>,
    /// Length, height, width, weight.
    pub dimensions: Dimensions,
    /// `Null` when unresolved, a string while raw, an object once parsed.
    pub technical_specs: Value,
    /// Documentation URL, raw answer until validated.
    pub technical_doc: Option<String>,
    /// Confidence score in `[0, 100]`.
    pub confidence_score: f64,
    /// Secondary judge score, always zero.
    pub llm2llm_score: f64,
    /// Number of failed attempts recorded for this name.
    pub retries_number: u32,
}

impl Record {
    /// Creates a record with every enrichable field unresolved.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        model: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            model: model.into(),
            category: category.into(),
            description: None,
            price: None,
            dimensions: Dimensions::default(),
            technical_specs: Value::Null,
            technical_doc: None,
            confidence_score: 0.0,
            llm2llm_score: 0.0,
            retries_number: 0,
        }
    }

    /// Builds a record from an input table row.
    ///
    /// Columns are positional: id, name, type, model, description, price,
    /// length, height, width, weight, technical specs, technical doc,
    /// category. Missing, empty and `nan` cells stay unresolved.
    #[must_use]
    pub fn from_row(row: &[String]) -> Self {
        let text = |index: usize| row.get(index).map_or("", |cell| cell.trim());
        let cell = |index: usize| {
            let value = text(index);
            (!is_unresolved(Some(value))).then(|| value.to_string())
        };

        let technical_specs = match cell(10) {
            Some(raw) if raw != "[]" && raw != "{}" => Value::String(raw),
            _ => Value::Null,
        };

        Self {
            description: cell(4),
            price: cell(5),
            dimensions: Dimensions([cell(6), cell(7), cell(8), cell(9)]),
            technical_specs,
            technical_doc: cell(11),
            ..Self::new(text(0), text(1), text(2), text(3), text(12))
        }
    }

    /// Record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record name, also the query subject and ledger key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instrument type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Instrument model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Catalog category, used by the price filter.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns `true` if the technical specification needs a query.
    #[must_use]
    pub fn specs_unresolved(&self) -> bool {
        match &self.technical_specs {
            Value::Null => true,
            Value::String(raw) => {
                let raw = raw.trim();
                is_unresolved(Some(raw)) || raw == "[]" || raw == "{}"
            }
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Fields that must be (re-)queried, in query order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if is_unresolved(self.description.as_deref()) {
            missing.push(Field::Description);
        }
        if is_unresolved(self.price.as_deref()) {
            missing.push(Field::Price);
        }
        if self.dimensions.is_unresolved() {
            missing.extend(Field::AXES);
        }
        if self.specs_unresolved() {
            missing.push(Field::TechnicalSpecs);
        }
        if is_unresolved(self.technical_doc.as_deref()) {
            missing.push(Field::TechnicalDoc);
        }
        missing
    }

    /// Stores a raw answer into `field`.
    pub fn set_raw(&mut self, field: Field, answer: Option<String>) {
        match field {
            Field::Description => self.description = answer,
            Field::Price => self.price = answer,
            Field::TechnicalSpecs => {
                self.technical_specs = answer.map_or(Value::Null, Value::String);
            }
            Field::TechnicalDoc => self.technical_doc = answer,
            axis => {
                if let Some(slot) = self.dimensions.axis_mut(axis) {
                    *slot = answer;
                }
            }
        }
    }

    /// Renders the output/error table row matching [`OUTPUT_COLUMNS`].
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        let or_missing = |value: &str| {
            if value.is_empty() {
                MISSING.to_string()
            } else {
                value.to_string()
            }
        };
        let optional = |value: &Option<String>| {
            value.as_deref().map_or_else(|| MISSING.to_string(), or_missing)
        };
        let axis = |value: &Option<String>| value.clone().unwrap_or_default();
        let specs = match &self.technical_specs {
            Value::Null => MISSING.to_string(),
            Value::String(raw) => or_missing(raw.as_str()),
            other => other.to_string(),
        };
        let [length, height, width, weight] = &self.dimensions.0;

        vec![
            or_missing(self.id.as_str()),
            or_missing(self.name.as_str()),
            or_missing(self.kind.as_str()),
            or_missing(self.model.as_str()),
            optional(&self.description),
            optional(&self.price),
            axis(length),
            axis(height),
            axis(width),
            axis(weight),
            specs,
            optional(&self.technical_doc),
            format!("{:?}", self.confidence_score),
            format!("{:?}", self.llm2llm_score),
            self.retries_number.to_string(),
        ]
    }
}
