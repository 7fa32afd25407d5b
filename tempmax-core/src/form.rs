//! Editable snapshot of a [`PredictionInput`].
//!
//! Every edit is coerced immediately: the date field keeps its raw text, every
//! other field is parsed into an `f64`. Parse failures are kept as
//! [`FieldValue::Invalid`] so the form can still be shown and corrected, but
//! [`PredictionForm::snapshot`] refuses to produce an input while any field is
//! invalid.

use std::{collections::BTreeMap, fmt};

use chrono::{Local, NaiveDate};

use crate::{
    error::{FieldError, FormError},
    model::PredictionInput,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FechaObservacion,
    HumMaximo,
    HumMedia,
    HumMinimo,
    RadMaximo,
    RadTotal,
    RainTotal,
    TempMedia,
    TempMinimo,
    WspMaximo,
    WspMedia,
    WspMinimo,
}

impl Field {
    /// Wire name used in the JSON body.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FechaObservacion => "fecha_observacion",
            Field::HumMaximo => "hum_maximo",
            Field::HumMedia => "hum_media",
            Field::HumMinimo => "hum_minimo",
            Field::RadMaximo => "rad_maximo",
            Field::RadTotal => "rad_total",
            Field::RainTotal => "rain_total",
            Field::TempMedia => "temp_media",
            Field::TempMinimo => "temp_minimo",
            Field::WspMaximo => "wsp_maximo",
            Field::WspMedia => "wsp_media",
            Field::WspMinimo => "wsp_minimo",
        }
    }

    /// All fields in form order: date first, then the numeric covariates.
    pub const fn all() -> &'static [Field] {
        &[
            Field::FechaObservacion,
            Field::TempMedia,
            Field::TempMinimo,
            Field::HumMaximo,
            Field::HumMedia,
            Field::HumMinimo,
            Field::WspMaximo,
            Field::WspMedia,
            Field::WspMinimo,
            Field::RadMaximo,
            Field::RadTotal,
            Field::RainTotal,
        ]
    }

    pub fn numeric() -> impl Iterator<Item = Field> {
        Field::all().iter().copied().filter(|f| !f.is_date())
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Field::FechaObservacion)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::FechaObservacion => "Observation date",
            Field::HumMaximo => "Maximum humidity",
            Field::HumMedia => "Mean humidity",
            Field::HumMinimo => "Minimum humidity",
            Field::RadMaximo => "Maximum solar radiation",
            Field::RadTotal => "Total solar radiation",
            Field::RainTotal => "Total rainfall",
            Field::TempMedia => "Mean temperature",
            Field::TempMinimo => "Minimum temperature",
            Field::WspMaximo => "Maximum wind speed",
            Field::WspMedia => "Mean wind speed",
            Field::WspMinimo => "Minimum wind speed",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Field::FechaObservacion => None,
            Field::HumMaximo | Field::HumMedia | Field::HumMinimo => Some("%"),
            Field::RadMaximo => Some("W/m²"),
            Field::RadTotal => Some("MJ/m²"),
            Field::RainTotal => Some("mm"),
            Field::TempMedia | Field::TempMinimo => Some("°C"),
            Field::WspMaximo | Field::WspMedia | Field::WspMinimo => Some("m/s"),
        }
    }

    /// Seed value so a fresh form is submittable without edits.
    fn seed(&self) -> Option<f64> {
        let value = match self {
            Field::FechaObservacion => return None,
            Field::HumMaximo => 85.0,
            Field::HumMedia => 70.0,
            Field::HumMinimo => 55.0,
            Field::RadMaximo => 800.0,
            Field::RadTotal => 20.0,
            Field::RainTotal => 0.0,
            Field::TempMedia => 20.0,
            Field::TempMinimo => 15.0,
            Field::WspMaximo => 10.0,
            Field::WspMedia => 5.0,
            Field::WspMinimo => 0.0,
        };
        Some(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Field {
    type Error = FieldError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Field::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == value)
            .ok_or_else(|| FieldError::UnknownField(value.to_string()))
    }
}

/// Current value of a numeric field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Valid(f64),
    /// The raw text did not parse; kept so it can be shown back to the user.
    Invalid(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Valid(v) => Some(*v),
            FieldValue::Invalid(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Valid(v) => write!(f, "{v}"),
            FieldValue::Invalid(raw) => f.write_str(raw),
        }
    }
}

/// Parse raw input for a numeric field. Empty text and non-finite values
/// (`NaN`, `inf`) are rejected.
pub fn parse_field(field: Field, raw: &str) -> Result<f64, FieldError> {
    let not_a_number = || FieldError::NotANumber { field, raw: raw.to_string() };

    let value: f64 = raw.trim().parse().map_err(|_| not_a_number())?;
    if value.is_finite() { Ok(value) } else { Err(not_a_number()) }
}

/// Parse the observation date (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, FieldError> {
    let field = Field::FechaObservacion;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::MissingDate { field });
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| FieldError::InvalidDate { field, raw: raw.to_string() })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionForm {
    fecha_observacion: String,
    numbers: BTreeMap<Field, FieldValue>,
}

impl Default for PredictionForm {
    fn default() -> Self {
        Self::initialize()
    }
}

impl PredictionForm {
    /// Fresh form seeded with today's date and mid-range covariates.
    pub fn initialize() -> Self {
        Self::with_date(Local::now().date_naive())
    }

    pub fn with_date(date: NaiveDate) -> Self {
        let numbers = Field::numeric()
            .filter_map(|f| f.seed().map(|v| (f, FieldValue::Valid(v))))
            .collect();

        Self { fecha_observacion: date.format(DATE_FORMAT).to_string(), numbers }
    }

    /// Update exactly one field. The date keeps the raw text unmodified; other
    /// fields are coerced, and a parse failure is stored as invalid rather
    /// than returned.
    pub fn set_field(&mut self, field: Field, raw: &str) {
        if field.is_date() {
            self.fecha_observacion = raw.to_string();
            return;
        }

        let value = match parse_field(field, raw) {
            Ok(v) => FieldValue::Valid(v),
            Err(_) => FieldValue::Invalid(raw.to_string()),
        };
        self.numbers.insert(field, value);
    }

    /// Same as [`set_field`](Self::set_field), addressing the field by its wire name.
    pub fn set_field_by_name(&mut self, name: &str, raw: &str) -> Result<(), FieldError> {
        let field = Field::try_from(name)?;
        self.set_field(field, raw);
        Ok(())
    }

    /// Current text for a field, as it would be shown in an input box.
    pub fn raw_value(&self, field: Field) -> String {
        if field.is_date() {
            return self.fecha_observacion.clone();
        }

        self.numbers.get(&field).map(ToString::to_string).unwrap_or_default()
    }

    /// Every field that currently blocks submission, in form order.
    pub fn validate(&self) -> Vec<FieldError> {
        Field::all()
            .iter()
            .filter_map(|&field| self.check(field).err())
            .collect()
    }

    fn check(&self, field: Field) -> Result<(), FieldError> {
        if field.is_date() {
            return parse_date(&self.fecha_observacion).map(|_| ());
        }

        match self.numbers.get(&field) {
            Some(FieldValue::Valid(_)) => Ok(()),
            Some(FieldValue::Invalid(raw)) => {
                Err(FieldError::NotANumber { field, raw: raw.clone() })
            }
            None => Err(FieldError::NotANumber { field, raw: String::new() }),
        }
    }

    fn number(&self, field: Field) -> f64 {
        self.numbers.get(&field).and_then(FieldValue::as_f64).unwrap_or(f64::NAN)
    }

    /// Typed, owned copy of the current values. Fails with every offending
    /// field when any of them is invalid.
    pub fn snapshot(&self) -> Result<PredictionInput, FormError> {
        let issues = self.validate();
        if !issues.is_empty() {
            return Err(FormError { issues });
        }

        let fecha_observacion =
            parse_date(&self.fecha_observacion).map_err(|e| FormError { issues: vec![e] })?;

        Ok(PredictionInput {
            fecha_observacion,
            hum_maximo: self.number(Field::HumMaximo),
            hum_media: self.number(Field::HumMedia),
            hum_minimo: self.number(Field::HumMinimo),
            rad_maximo: self.number(Field::RadMaximo),
            rad_total: self.number(Field::RadTotal),
            rain_total: self.number(Field::RainTotal),
            temp_media: self.number(Field::TempMedia),
            temp_minimo: self.number(Field::TempMinimo),
            wsp_maximo: self.number(Field::WspMaximo),
            wsp_media: self.number(Field::WspMedia),
            wsp_minimo: self.number(Field::WspMinimo),
        })
    }
}
