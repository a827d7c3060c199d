use crate::config::MAX_TERM_YEARS;
use crate::error::{LoanError, Result};

/// Loan-to-value ratio above which private mortgage insurance is charged.
pub const PMI_LTV_THRESHOLD: f64 = 0.80;

/// Level monthly principal and interest payment that fully amortizes `principal`
/// over `total_months` at `monthly_rate` (decimal, e.g. 0.065 / 12).
pub fn monthly_payment(principal: f64, monthly_rate: f64, total_months: u32) -> Result<f64> {
    if total_months == 0 {
        return Err(LoanError::invalid(
            "total_months",
            "term must be at least one month",
        ));
    }
    if total_months > MAX_TERM_YEARS * 12 {
        return Err(LoanError::invalid(
            "total_months",
            format!("term must be at most {} months, got {total_months}", MAX_TERM_YEARS * 12),
        ));
    }
    if !(principal > 0.) || !principal.is_finite() {
        return Err(LoanError::invalid(
            "principal",
            format!("principal must be positive, got {principal}"),
        ));
    }
    if !(monthly_rate >= 0.) || !monthly_rate.is_finite() {
        return Err(LoanError::invalid(
            "monthly_rate",
            format!("rate must be non-negative, got {monthly_rate}"),
        ));
    }

    // straight-line at 0%, the annuity formula divides by zero there
    if monthly_rate == 0. {
        return Ok(principal / total_months as f64);
    }

    let factor = (1. + monthly_rate).powi(total_months as i32);
    Ok(principal * monthly_rate * factor / (factor - 1.))
}

/// Monthly PMI charge, priced on the original loan amount.
pub fn monthly_pmi(loan_amount: f64, pmi_annual_rate: f64) -> f64 {
    loan_amount * pmi_annual_rate / 12.
}

/// PMI for a month whose post-payment balance is `balance`. The threshold is
/// strict: exactly 80% LTV carries no PMI.
pub fn pmi_for_balance(balance: f64, home_price: f64, loan_amount: f64, pmi_annual_rate: f64) -> f64 {
    if balance / home_price > PMI_LTV_THRESHOLD {
        monthly_pmi(loan_amount, pmi_annual_rate)
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::{monthly_payment, monthly_pmi, pmi_for_balance};
    use crate::error::LoanError;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use test_log::test;

    #[test]
    fn test_monthly_payment() {
        let pmt = monthly_payment(640000., 0.065 / 12., 360).unwrap();
        assert_abs_diff_eq!(pmt, 4045.2354, epsilon = 0.001);

        let pmt = monthly_payment(200000., 0.07 / 12., 180).unwrap();
        assert_abs_diff_eq!(pmt, 1797.6565, epsilon = 0.001);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let pmt = monthly_payment(360000., 0., 360).unwrap();
        assert_relative_eq!(pmt, 1000.);
    }

    #[test]
    fn test_payment_retires_balance() {
        for (principal, annual_rate, months) in [
            (640000., 0.065, 360),
            (250000., 0.02, 180),
            (1000., 0.19, 12),
            (90000., 0., 120),
        ] {
            let monthly_rate = annual_rate / 12.;
            let pmt = monthly_payment(principal, monthly_rate, months).unwrap();
            let mut balance: f64 = principal;
            for _ in 0..months {
                balance -= pmt - balance * monthly_rate;
            }
            assert_abs_diff_eq!(balance, 0., epsilon = 1e-6);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            monthly_payment(100000., 0.005, 0),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            monthly_payment(0., 0.005, 360),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            monthly_payment(-5., 0.005, 360),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            monthly_payment(f64::NAN, 0.005, 360),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            monthly_payment(100000., 0.005, u32::MAX),
            Err(LoanError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_pmi_boundary() {
        assert_relative_eq!(monthly_pmi(640000., 0.005), 266.6666666, epsilon = 1e-6);
        // exactly 80% LTV is not charged
        assert_eq!(pmi_for_balance(640000., 800000., 640000., 0.005), 0.);
        assert!(pmi_for_balance(640000.01, 800000., 640000., 0.005) > 0.);
    }
}
