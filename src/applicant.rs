// 🧾 Applicant Record - raw loan application fields as sent by the caller

use crate::error::PredictionError;
use crate::schema::RAW_FIELDS;
use serde_json::{Map, Value};

/// Raw applicant attributes, before any feature engineering.
///
/// Categorical codes are kept as integers; the model sees them as numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantRecord {
    pub person_age: f64,
    pub person_income: f64,
    /// 1: Rent, 2: Mortgage, 3: Own, 4: Other
    pub person_home_ownership: i64,
    pub person_emp_length: f64,
    /// 0: Personal, 1: Education, 2: Medical, 3: Venture, 4: Home Improvement, 5: Debt Consolidation
    pub loan_intent: i64,
    /// Ordinal grade, 1 (A) upwards
    pub loan_grade: i64,
    pub loan_amnt: f64,
    pub loan_int_rate: f64,
    /// 0: No, 1: Yes
    pub cb_person_default_on_file: i64,
    pub cb_person_cred_hist_length: f64,

    /// Only read by the legacy formulas, which take it as input
    pub loan_percent_income: Option<f64>,
}

impl ApplicantRecord {
    /// Parse the raw fields out of a JSON object.
    ///
    /// Unknown keys are ignored, so a caller sending derived columns too is
    /// not an error; those values are recomputed anyway. That includes
    /// `loan_percent_income`, see `read_loan_percent_income`.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self, PredictionError> {
        // Report the first missing field in schema order before any type error
        if let Some(missing) = RAW_FIELDS.iter().find(|f| is_absent(map, f)) {
            return Err(PredictionError::MissingField(missing.to_string()));
        }

        Ok(ApplicantRecord {
            person_age: number(map, "person_age")?,
            person_income: number(map, "person_income")?,
            person_home_ownership: code(map, "person_home_ownership")?,
            person_emp_length: number(map, "person_emp_length")?,
            loan_intent: code(map, "loan_intent")?,
            loan_grade: code(map, "loan_grade")?,
            loan_amnt: number(map, "loan_amnt")?,
            loan_int_rate: number(map, "loan_int_rate")?,
            cb_person_default_on_file: flag(map, "cb_person_default_on_file")?,
            cb_person_cred_hist_length: number(map, "cb_person_cred_hist_length")?,
            loan_percent_income: None,
        })
    }

    /// Take `loan_percent_income` from the body as an input value.
    ///
    /// Only formulas that consume it call this; absent leaves it `None`.
    pub fn read_loan_percent_income(&mut self, map: &Map<String, Value>) -> Result<(), PredictionError> {
        if !is_absent(map, "loan_percent_income") {
            self.loan_percent_income = Some(number(map, "loan_percent_income")?);
        }
        Ok(())
    }

    /// Parse a request body that has already been decoded to a JSON value
    pub fn from_value(value: &Value) -> Result<Self, PredictionError> {
        match value {
            Value::Object(map) => Self::from_json(map),
            other => Err(PredictionError::InvalidBody(format!(
                "expected a JSON object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn is_absent(map: &Map<String, Value>, field: &str) -> bool {
    matches!(map.get(field), None | Some(Value::Null))
}

fn number(map: &Map<String, Value>, field: &str) -> Result<f64, PredictionError> {
    map.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| PredictionError::type_mismatch(field, "a number"))
}

fn code(map: &Map<String, Value>, field: &str) -> Result<i64, PredictionError> {
    let value = number(map, field)
        .map_err(|_| PredictionError::type_mismatch(field, "an integer code"))?;

    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(PredictionError::type_mismatch(field, "an integer code"));
    }
    Ok(value as i64)
}

fn flag(map: &Map<String, Value>, field: &str) -> Result<i64, PredictionError> {
    match code(map, field) {
        Ok(v @ (0 | 1)) => Ok(v),
        _ => Err(PredictionError::type_mismatch(field, "0 or 1")),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
