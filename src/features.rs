// 🧮 Feature Engineering - raw applicant record → model input row
// Pure arithmetic: no state, same input always yields the same row

use crate::applicant::ApplicantRecord;
use crate::error::PredictionError;
use crate::schema::{FeatureVector, FEATURE_COUNT};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// FORMULA SETS
// ============================================================================

/// Which derivation formulas to apply.
///
/// `Guarded` is the service contract. `Legacy` keeps the older ratio
/// formulas around so they can be compared; it is never the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaSet {
    /// Percentage-based formulas; zero income or employment length yields 0
    #[default]
    Guarded,
    /// Simple ratios; takes `loan_percent_income` as input and fails on zero denominators
    Legacy,
}

impl FormulaSet {
    pub fn name(&self) -> &str {
        match self {
            FormulaSet::Guarded => "guarded",
            FormulaSet::Legacy => "legacy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "guarded" => Some(FormulaSet::Guarded),
            "legacy" => Some(FormulaSet::Legacy),
            _ => None,
        }
    }
}

/// Derived columns, before they are laid out in schema order
#[derive(Debug, Clone, Copy, PartialEq)]
struct Derived {
    loan_percent_income: f64,
    loan_to_income: f64,
    age_income_interaction: f64,
    loan_to_emp_length_ratio: f64,
    monthly_debt: f64,
    dti_ratio: f64,
    risk_flag: f64,
}

/// Grades considered risky when the applicant has a default on file
const RISKY_GRADES: [i64; 3] = [3, 4, 5];

/// 1 when the applicant has defaulted before and holds a mid-to-low grade
pub fn risk_flag(record: &ApplicantRecord) -> f64 {
    if record.cb_person_default_on_file == 1 && RISKY_GRADES.contains(&record.loan_grade) {
        1.0
    } else {
        0.0
    }
}

fn guarded(r: &ApplicantRecord) -> Derived {
    let monthly_debt = r.loan_amnt * (1.0 + r.loan_int_rate / 100.0);

    let (dti_ratio, loan_percent_income, loan_to_income) = if r.person_income == 0.0 {
        (0.0, 0.0, 0.0)
    } else {
        let ratio = r.loan_amnt / r.person_income;
        let percent = ratio * 100.0;
        ((monthly_debt * 12.0) / r.person_income, percent, ratio - percent)
    };

    let loan_to_emp_length_ratio = if r.person_emp_length == 0.0 {
        0.0
    } else {
        r.loan_amnt / r.person_emp_length
    };

    Derived {
        loan_percent_income,
        loan_to_income,
        age_income_interaction: r.person_age * r.person_income,
        loan_to_emp_length_ratio,
        monthly_debt,
        dti_ratio,
        risk_flag: risk_flag(r),
    }
}

fn legacy(r: &ApplicantRecord) -> Result<Derived, PredictionError> {
    let loan_percent_income = r
        .loan_percent_income
        .ok_or_else(|| PredictionError::MissingField("loan_percent_income".to_string()))?;

    let monthly_debt = r.person_income * loan_percent_income;

    Ok(Derived {
        loan_percent_income,
        loan_to_income: divide("loan_to_income", r.loan_amnt, r.person_income, "person_income")?,
        age_income_interaction: r.person_age * r.person_income,
        loan_to_emp_length_ratio: divide(
            "loan_to_emp_length_ratio",
            r.loan_amnt,
            r.person_emp_length,
            "person_emp_length",
        )?,
        monthly_debt,
        dti_ratio: divide("dti_ratio", monthly_debt, r.loan_amnt, "loan_amnt")?,
        risk_flag: risk_flag(r),
    })
}

fn divide(column: &str, numerator: f64, denominator: f64, name: &str) -> Result<f64, PredictionError> {
    if denominator == 0.0 {
        return Err(PredictionError::DivisionByZero {
            column: column.to_string(),
            denominator: name.to_string(),
        });
    }
    Ok(numerator / denominator)
}

// ============================================================================
// FEATURE DERIVER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver {
    formulas: FormulaSet,
}

impl FeatureDeriver {
    pub fn new(formulas: FormulaSet) -> Self {
        FeatureDeriver { formulas }
    }

    pub fn formulas(&self) -> FormulaSet {
        self.formulas
    }

    /// Compute the full model input row for one applicant
    pub fn derive(&self, record: &ApplicantRecord) -> Result<FeatureVector, PredictionError> {
        let d = match self.formulas {
            FormulaSet::Guarded => guarded(record),
            FormulaSet::Legacy => legacy(record)?,
        };

        // Order must follow schema::FEATURE_COLUMNS
        let values: [f64; FEATURE_COUNT] = [
            record.person_age,
            record.person_income,
            record.person_home_ownership as f64,
            record.person_emp_length,
            record.loan_intent as f64,
            record.loan_grade as f64,
            record.loan_amnt,
            record.loan_int_rate,
            d.loan_percent_income,
            record.cb_person_default_on_file as f64,
            record.cb_person_cred_hist_length,
            d.loan_to_income,
            d.age_income_interaction,
            d.loan_to_emp_length_ratio,
            d.monthly_debt,
            d.dti_ratio,
            d.risk_flag,
        ];

        Ok(FeatureVector::from_values(values))
    }

    /// Parse the fields these formulas read from a decoded request body
    pub fn parse(&self, body: &Value) -> Result<ApplicantRecord, PredictionError> {
        let mut record = ApplicantRecord::from_value(body)?;
        if let (FormulaSet::Legacy, Value::Object(map)) = (self.formulas, body) {
            record.read_loan_percent_income(map)?;
        }
        Ok(record)
    }

    /// Parse a decoded request body and derive its row
    pub fn derive_json(&self, body: &Value) -> Result<FeatureVector, PredictionError> {
        let record = self.parse(body)?;
        self.derive(&record)
    }
}

// ============================================================================
// TESTS
// ============================================================================
