// Per-request failures: anything that can go wrong between a request body
// and a class label. Startup failures (model loading, config) use anyhow.

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Body is not valid JSON, or not a JSON object
    InvalidBody(String),
    /// Required raw field absent or null
    MissingField(String),
    /// Field present but not coercible to its expected type
    TypeMismatch { field: String, expected: String },
    /// Zero denominator under the legacy formulas
    DivisionByZero { column: String, denominator: String },
    /// Model could not score the row
    Inference(String),
}

impl PredictionError {
    pub fn type_mismatch(field: &str, expected: &str) -> Self {
        PredictionError::TypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Short machine-friendly tag, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::InvalidBody(_) => "invalid_body",
            PredictionError::MissingField(_) => "missing_field",
            PredictionError::TypeMismatch { .. } => "type_mismatch",
            PredictionError::DivisionByZero { .. } => "division_by_zero",
            PredictionError::Inference(_) => "inference",
        }
    }
}

impl std::fmt::Display for PredictionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionError::InvalidBody(msg) => write!(f, "invalid request body: {}", msg),
            PredictionError::MissingField(field) => write!(f, "missing required field '{}'", field),
            PredictionError::TypeMismatch { field, expected } => {
                write!(f, "field '{}' must be {}", field, expected)
            }
            PredictionError::DivisionByZero { column, denominator } => write!(
                f,
                "cannot compute '{}': division by zero ('{}' is 0)",
                column, denominator
            ),
            PredictionError::Inference(msg) => write!(f, "inference failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = PredictionError::MissingField("loan_amnt".to_string());
        assert_eq!(err.to_string(), "missing required field 'loan_amnt'");

        let err = PredictionError::type_mismatch("loan_grade", "an integer code");
        assert_eq!(err.to_string(), "field 'loan_grade' must be an integer code");
        assert_eq!(err.kind(), "type_mismatch");
    }

    #[test]
    fn test_division_message() {
        let err = PredictionError::DivisionByZero {
            column: "loan_to_income".to_string(),
            denominator: "person_income".to_string(),
        };
        assert!(err.to_string().contains("division by zero"));
        assert!(err.to_string().contains("person_income"));
    }
}
