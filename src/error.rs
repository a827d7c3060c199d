use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("missing input: {field}")]
    MissingInput { field: String },

    #[error("refinance year {year} outside schedule years {first}..={last}")]
    RefinanceYearOutOfRange { year: u32, first: u32, last: u32 },
}

impl LoanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        LoanError::MissingInput {
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
