// 📐 Shape Layer - Feature Schema
// The one list of model input columns, shared by the deriver and the model loader

use serde_json::{Map, Value};

// ============================================================================
// COLUMN CONTRACT
// ============================================================================

/// Number of columns the model consumes
pub const FEATURE_COUNT: usize = 17;

/// Model input columns, in the order the model was trained on.
///
/// The deriver writes values in this order and the loader refuses any
/// artifact whose declared feature list is not exactly this.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "person_age",
    "person_income",
    "person_home_ownership",
    "person_emp_length",
    "loan_intent",
    "loan_grade",
    "loan_amnt",
    "loan_int_rate",
    "loan_percent_income",
    "cb_person_default_on_file",
    "cb_person_cred_hist_length",
    "loan_to_income",
    "age_income_interaction",
    "loan_to_emp_length_ratio",
    "monthly_debt",
    "dti_ratio",
    "risk_flag",
];

/// Raw fields every caller must supply
pub const RAW_FIELDS: [&str; 10] = [
    "person_age",
    "person_income",
    "person_home_ownership",
    "person_emp_length",
    "loan_intent",
    "loan_grade",
    "loan_amnt",
    "loan_int_rate",
    "cb_person_default_on_file",
    "cb_person_cred_hist_length",
];

/// Position of a column in the model input, if it is one
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == name)
}

/// Compare a declared column list against the contract.
///
/// Returns a description of the first difference, or `None` when they match.
pub fn schema_mismatch(declared: &[String]) -> Option<String> {
    if declared.len() != FEATURE_COUNT {
        return Some(format!(
            "expected {} features, artifact declares {}",
            FEATURE_COUNT,
            declared.len()
        ));
    }

    declared
        .iter()
        .zip(FEATURE_COLUMNS.iter())
        .enumerate()
        .find(|(_, (got, want))| got.as_str() != **want)
        .map(|(i, (got, want))| format!("feature {} is '{}', expected '{}'", i, got, want))
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// One fully-featured applicant row, values in `FEATURE_COLUMNS` order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        FeatureVector { values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        column_index(name).map(|i| self.values[i])
    }

    /// Iterate `(column, value)` pairs in contract order
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_COLUMNS.iter().copied().zip(self.values.iter().copied())
    }

    /// JSON object of all columns; use `columns()` when order matters
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.columns() {
            map.insert(name.to_string(), Value::from(value));
        }
        Value::Object(map)
    }
}

// ============================================================================
// TESTS
// ============================================================================
