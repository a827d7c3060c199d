use crate::error::{LoanError, Result};
use crate::payment::{monthly_payment, pmi_for_balance};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest term accepted, in years.
pub const MAX_TERM_YEARS: u32 = 50;

/// One loan offer. `loan_amount` is always `home_price - down_payment`.
///
/// Serialize only: a configuration is built through [`LoanConfiguration::new`].
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LoanConfiguration {
    home_price: f64,
    down_payment: f64,
    loan_amount: f64,
    annual_rate: f64,
    term_years: u32,
    discount_points: f64,
    point_cost: f64,
    pmi_annual_rate: f64,
}

impl LoanConfiguration {
    /// Rates are decimal fractions (0.065 for 6.5%). A non-positive loan amount is
    /// allowed here and rejected by the feasibility check.
    pub fn new(home_price: f64, down_payment: f64, annual_rate: f64, term_years: u32) -> Result<Self> {
        if !(home_price > 0.) || !home_price.is_finite() {
            return Err(LoanError::invalid(
                "home_price",
                format!("home price must be positive, got {home_price}"),
            ));
        }
        if !(down_payment >= 0.) || !down_payment.is_finite() {
            return Err(LoanError::invalid(
                "down_payment",
                format!("down payment must be non-negative, got {down_payment}"),
            ));
        }
        check_rate("annual_rate", annual_rate)?;
        check_term(term_years)?;

        Ok(Self {
            home_price,
            down_payment,
            loan_amount: home_price - down_payment,
            annual_rate,
            term_years,
            discount_points: 0.,
            point_cost: 0.,
            pmi_annual_rate: 0.,
        })
    }

    /// Points bought and the cash spent on them.
    pub fn with_points(self, discount_points: f64, point_cost: f64) -> Result<Self> {
        if !(discount_points >= 0.) || !discount_points.is_finite() {
            return Err(LoanError::invalid(
                "discount_points",
                format!("point count must be non-negative, got {discount_points}"),
            ));
        }
        if !(point_cost >= 0.) || !point_cost.is_finite() {
            return Err(LoanError::invalid(
                "point_cost",
                format!("point cost must be non-negative, got {point_cost}"),
            ));
        }
        Ok(Self {
            discount_points,
            point_cost,
            ..self
        })
    }

    /// Points priced at one percent of the loan amount each.
    pub fn with_discount_points(self, discount_points: f64) -> Result<Self> {
        self.with_discount_points_at(discount_points, POINT_PRICE)
    }

    /// Points priced at `point_price` of the loan amount each.
    pub fn with_discount_points_at(self, discount_points: f64, point_price: f64) -> Result<Self> {
        check_rate("point_price", point_price)?;
        let cost = (self.loan_amount * discount_points * point_price).max(0.);
        self.with_points(discount_points, cost)
    }

    pub fn with_pmi_rate(self, pmi_annual_rate: f64) -> Result<Self> {
        check_rate("pmi_annual_rate", pmi_annual_rate)?;
        Ok(Self {
            pmi_annual_rate,
            ..self
        })
    }

    /// Same home and PMI terms at a new rate and loan amount, no points.
    pub fn refinanced(&self, loan_amount: f64, annual_rate: f64, term_years: u32) -> Result<Self> {
        LoanConfiguration::new(self.home_price, self.home_price - loan_amount, annual_rate, term_years)?
            .with_pmi_rate(self.pmi_annual_rate)
    }

    pub fn home_price(&self) -> f64 {
        self.home_price
    }

    pub fn down_payment(&self) -> f64 {
        self.down_payment
    }

    pub fn loan_amount(&self) -> f64 {
        self.loan_amount
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate / 12.
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn term_months(&self) -> u32 {
        self.term_years * 12
    }

    pub fn discount_points(&self) -> f64 {
        self.discount_points
    }

    pub fn point_cost(&self) -> f64 {
        self.point_cost
    }

    pub fn pmi_annual_rate(&self) -> f64 {
        self.pmi_annual_rate
    }

    /// Down payment as a percentage of the home price.
    pub fn down_payment_pct(&self) -> f64 {
        self.down_payment / self.home_price * 100.
    }

    pub fn initial_ltv(&self) -> f64 {
        self.loan_amount / self.home_price
    }

    /// Level principal and interest payment.
    pub fn monthly_pi_payment(&self) -> Result<f64> {
        monthly_payment(self.loan_amount, self.monthly_rate(), self.term_months())
    }

    /// PMI charged at origination, judged on the starting loan-to-value.
    pub fn pmi_at_origination(&self) -> f64 {
        pmi_for_balance(
            self.loan_amount,
            self.home_price,
            self.loan_amount,
            self.pmi_annual_rate,
        )
    }
}

impl fmt::Display for LoanConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "home ${:.2}, down ${:.2}, loan ${:.2}, rate {:.3}%, {} years, {} points (${:.2})",
            self.home_price,
            self.down_payment,
            self.loan_amount,
            self.annual_rate * 100.,
            self.term_years,
            self.discount_points,
            self.point_cost
        )
    }
}

/// Price of one discount point as a fraction of the loan amount.
pub const POINT_PRICE: f64 = 0.01;

/// Grid bounds and pricing used by the point search and the max-points loan.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerSettings {
    pub cash_step: f64,
    pub max_points: u32,
    pub point_price: f64,
    pub rate_cut_per_point: f64,
    pub rate_floor: f64,
    pub min_down_fraction: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            cash_step: 1000.,
            max_points: 20,
            point_price: POINT_PRICE,
            rate_cut_per_point: 0.0025,
            rate_floor: 0.02,
            min_down_fraction: 0.03,
        }
    }
}

impl OptimizerSettings {
    /// Rate after buying `points`, never below the floor. A base rate already
    /// under the floor is left as is.
    pub fn discounted_rate(&self, base_rate: f64, points: u32) -> f64 {
        (base_rate - self.rate_cut_per_point * points as f64).max(self.rate_floor.min(base_rate))
    }
}

pub(crate) fn check_term(term_years: u32) -> Result<()> {
    if term_years == 0 {
        return Err(LoanError::invalid("term_years", "term must be at least one year"));
    }
    if term_years > MAX_TERM_YEARS {
        return Err(LoanError::invalid(
            "term_years",
            format!("term must be at most {MAX_TERM_YEARS} years, got {term_years}"),
        ));
    }
    Ok(())
}

fn check_rate(field: &str, rate: f64) -> Result<()> {
    if !(rate >= 0.) || !rate.is_finite() {
        return Err(LoanError::invalid(
            field,
            format!("rate must be a non-negative fraction, got {rate}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LoanConfiguration, OptimizerSettings, MAX_TERM_YEARS};
    use crate::error::LoanError;
    use approx::assert_relative_eq;
    use test_log::test;

    #[test]
    fn test_new_configuration() {
        let config = LoanConfiguration::new(800000., 160000., 0.065, 30)
            .unwrap()
            .with_pmi_rate(0.005)
            .unwrap();

        assert_eq!(config.loan_amount(), 640000.);
        assert_eq!(config.term_months(), 360);
        assert_relative_eq!(config.down_payment_pct(), 20., epsilon = 1e-9);
        assert_relative_eq!(config.initial_ltv(), 0.8);
        // exactly 80% LTV at origination
        assert_eq!(config.pmi_at_origination(), 0.);
        assert_eq!(config.to_string(), "home $800000.00, down $160000.00, loan $640000.00, rate 6.500%, 30 years, 0 points ($0.00)");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            LoanConfiguration::new(0., 0., 0.065, 30),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            LoanConfiguration::new(800000., -1., 0.065, 30),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            LoanConfiguration::new(800000., 0., -0.01, 30),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            LoanConfiguration::new(800000., 0., 0.065, 0),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(matches!(
            LoanConfiguration::new(800000., 0., 0.065, 400_000_000),
            Err(LoanError::InvalidInput { .. })
        ));
        assert!(LoanConfiguration::new(800000., 0., 0.065, MAX_TERM_YEARS).is_ok());
        assert!(matches!(
            LoanConfiguration::new(800000., 0., 0.065, MAX_TERM_YEARS + 1),
            Err(LoanError::InvalidInput { .. })
        ));

        // a fully paid home is constructible, just not feasible
        let config = LoanConfiguration::new(800000., 800000., 0.065, 30).unwrap();
        assert_eq!(config.loan_amount(), 0.);
        assert!(config.monthly_pi_payment().is_err());
    }

    #[test]
    fn test_discount_points() {
        let config = LoanConfiguration::new(800000., 28000., 0.0205, 30)
            .unwrap()
            .with_discount_points(17.)
            .unwrap();
        assert_relative_eq!(config.point_cost(), 772000. * 0.17, epsilon = 1e-6);
        assert_eq!(config.discount_points(), 17.);

        let config = LoanConfiguration::new(800000., 28000., 0.0205, 30)
            .unwrap()
            .with_discount_points_at(3., 0.02)
            .unwrap();
        assert_relative_eq!(config.point_cost(), 772000. * 0.06, epsilon = 1e-6);
    }

    #[test]
    fn test_discounted_rate_floor() {
        let settings = OptimizerSettings::default();
        assert_relative_eq!(settings.discounted_rate(0.065, 0), 0.065);
        assert_relative_eq!(settings.discounted_rate(0.065, 4), 0.055, epsilon = 1e-12);
        assert_eq!(settings.discounted_rate(0.065, 20), 0.02);
        assert_eq!(settings.discounted_rate(0.015, 3), 0.015);
    }
}
