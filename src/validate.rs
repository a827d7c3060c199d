use crate::config::LoanConfiguration;
use log::debug;

/// Why a configuration fails the feasibility check.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Rejection {
    NoLoanAmount,
    DegeneratePayment,
    PaymentOverMax { total_monthly: f64, max_monthly: f64 },
    CashShort { cash_needed: f64, total_cash: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NoLoanAmount => write!(f, "loan amount is not positive"),
            Rejection::DegeneratePayment => write!(f, "monthly payment is not positive"),
            Rejection::PaymentOverMax {
                total_monthly,
                max_monthly,
            } => write!(
                f,
                "monthly payment ${:.2} exceeds maximum ${:.2}",
                total_monthly, max_monthly
            ),
            Rejection::CashShort {
                cash_needed,
                total_cash,
            } => write!(
                f,
                "needs ${:.2} cash at closing, only ${:.2} available",
                cash_needed, total_cash
            ),
        }
    }
}

/// Check a configuration against the monthly payment ceiling and the cash on
/// hand. `monthly_pi_payment` excludes PMI, which is added from the origination
/// loan-to-value.
pub fn check_feasibility(
    config: &LoanConfiguration,
    monthly_pi_payment: f64,
    max_monthly: f64,
    total_cash: f64,
) -> Result<(), Rejection> {
    if !(config.loan_amount() > 0.) {
        return Err(Rejection::NoLoanAmount);
    }

    let total_monthly = monthly_pi_payment + config.pmi_at_origination();
    // NaN payments fall through to here too
    if !(total_monthly > 0.) {
        return Err(Rejection::DegeneratePayment);
    }
    if total_monthly > max_monthly {
        return Err(Rejection::PaymentOverMax {
            total_monthly,
            max_monthly,
        });
    }

    let cash_needed = config.down_payment() + config.point_cost();
    if cash_needed > total_cash {
        return Err(Rejection::CashShort {
            cash_needed,
            total_cash,
        });
    }
    Ok(())
}

pub fn is_valid(
    config: &LoanConfiguration,
    monthly_pi_payment: f64,
    max_monthly: f64,
    total_cash: f64,
) -> bool {
    match check_feasibility(config, monthly_pi_payment, max_monthly, total_cash) {
        Ok(()) => true,
        Err(rejection) => {
            debug!("rejected {}: {}", config, rejection);
            false
        }
    }
}
