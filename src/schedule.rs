use crate::config::LoanConfiguration;
use crate::error::Result;
use crate::payment::{monthly_payment, pmi_for_balance};
use log::{debug, trace};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One month of a schedule.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScheduleEntry {
    /// 1-based, restarts at 1 in each schedule segment
    pub month_index: u32,
    /// 0-based and continuous across a refinance splice
    pub year_index: u32,
    /// principal and interest only
    pub scheduled_payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub ending_balance: f64,
    pub cumulative_interest: f64,
    pub pmi_amount: f64,
    pub total_payment: f64,
    pub one_time_costs: f64,
}

impl ScheduleEntry {
    /// Balance before this month's payment.
    pub fn beginning_balance(&self) -> f64 {
        self.ending_balance + self.principal_portion
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, year {}, payment ${:.2}, principal ${:.2}, interest ${:.2}, pmi ${:.2}, total ${:.2}, ending balance ${:.2}",
            self.month_index,
            self.year_index,
            self.scheduled_payment,
            self.principal_portion,
            self.interest_portion,
            self.pmi_amount,
            self.total_payment,
            self.ending_balance
        )
    }
}

/// Chronological month-by-month schedule for one loan, or a loan spliced with
/// its refinance.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmortizationSchedule {
    start_year: u32,
    term_years: u32,
    entries: Vec<ScheduleEntry>,
}

impl AmortizationSchedule {
    pub(crate) fn from_parts(start_year: u32, term_years: u32, entries: Vec<ScheduleEntry>) -> Self {
        Self {
            start_year,
            term_years,
            entries,
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn start_year(&self) -> u32 {
        self.start_year
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn first_year(&self) -> Option<u32> {
        self.entries.first().map(|e| e.year_index)
    }

    pub fn last_year(&self) -> Option<u32> {
        self.entries.last().map(|e| e.year_index)
    }

    /// Balance after the last payment of `year`, if the schedule covers it.
    pub fn balance_at_year(&self, year: u32) -> Option<f64> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.year_index == year)
            .map(|e| e.ending_balance)
    }

    pub fn final_balance(&self) -> f64 {
        self.entries.last().map_or(0., |e| e.ending_balance)
    }

    /// Number of months carrying a PMI charge.
    pub fn pmi_months(&self) -> usize {
        self.entries.iter().filter(|e| e.pmi_amount > 0.).count()
    }

    pub fn total_interest(&self) -> f64 {
        self.entries.iter().map(|e| e.interest_portion).sum()
    }

    /// Every monthly payment including PMI, excluding one-time costs.
    pub fn total_paid(&self) -> f64 {
        self.entries.iter().map(|e| e.total_payment).sum()
    }

    pub fn one_time_costs(&self) -> f64 {
        self.entries.iter().map(|e| e.one_time_costs).sum()
    }

    pub fn show_amortization(&self) {
        for entry in &self.entries {
            println!("{}", entry);
        }
    }
}

/// Expand a configuration into its full schedule. Year indices start at
/// `start_year_offset`; `one_time_costs_at_start` lands on the first entry only.
pub fn build_schedule(
    config: &LoanConfiguration,
    start_year_offset: u32,
    one_time_costs_at_start: f64,
) -> Result<AmortizationSchedule> {
    let monthly_rate = config.monthly_rate();
    let total_months = config.term_months();
    let home_price = config.home_price();
    let loan_amount = config.loan_amount();
    let payment = monthly_payment(loan_amount, monthly_rate, total_months)?;
    debug!(
        "building {} month schedule for ${:.2} at {:.3}%, payment ${:.2}",
        total_months,
        loan_amount,
        config.annual_rate() * 100.,
        payment
    );

    let mut entries = Vec::with_capacity(total_months as usize);
    let mut balance = loan_amount;
    let mut cumulative_interest = 0.;

    for month in 1..=total_months {
        let interest = balance * monthly_rate;
        let principal = payment - interest;
        balance -= principal;
        cumulative_interest += interest;

        // LTV is judged on the post-payment balance
        let pmi = pmi_for_balance(balance, home_price, loan_amount, config.pmi_annual_rate());
        trace!(
            "month {}, interest {}, principal {}, balance {}, pmi {}",
            month,
            interest,
            principal,
            balance,
            pmi
        );

        entries.push(ScheduleEntry {
            month_index: month,
            year_index: start_year_offset + (month - 1) / 12,
            scheduled_payment: payment,
            principal_portion: principal,
            interest_portion: interest,
            ending_balance: balance.max(0.),
            cumulative_interest,
            pmi_amount: pmi,
            total_payment: payment + pmi,
            one_time_costs: if month == 1 { one_time_costs_at_start } else { 0. },
        });
    }

    Ok(AmortizationSchedule::from_parts(
        start_year_offset,
        config.term_years(),
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::build_schedule;
    use crate::config::LoanConfiguration;
    use crate::error::LoanError;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use test_log::test;

    fn loan(down_payment: f64, rate: f64, pmi: f64) -> LoanConfiguration {
        LoanConfiguration::new(800000., down_payment, rate, 30)
            .unwrap()
            .with_pmi_rate(pmi)
            .unwrap()
    }

    #[test]
    fn test_build_schedule() {
        let schedule = build_schedule(&loan(160000., 0.065, 0.005), 0, 0.).unwrap();

        assert_eq!(schedule.len(), 360);
        let first = schedule.entries()[0];
        assert_eq!(first.month_index, 1);
        assert_eq!(first.year_index, 0);
        assert_abs_diff_eq!(first.interest_portion, 3466.6667, epsilon = 1e-4);
        assert_abs_diff_eq!(first.principal_portion, 578.5687, epsilon = 1e-4);
        assert_abs_diff_eq!(first.ending_balance, 639421.4313, epsilon = 1e-4);
        // starts at exactly 80% LTV so no PMI ever
        assert_eq!(schedule.pmi_months(), 0);

        let last = schedule.entries()[359];
        assert_eq!(last.month_index, 360);
        assert_eq!(last.year_index, 29);
        assert_abs_diff_eq!(last.ending_balance, 0., epsilon = 1e-6);
        assert_relative_eq!(last.cumulative_interest, schedule.total_interest(), epsilon = 1e-6);
        assert_abs_diff_eq!(schedule.total_interest(), 4045.2354 * 360. - 640000., epsilon = 0.1);
    }

    #[test]
    fn test_balance_and_interest_monotonic() {
        for config in [loan(40000., 0.065, 0.005), loan(0., 0.0725, 0.01), loan(28000., 0., 0.002)] {
            let schedule = build_schedule(&config, 0, 0.).unwrap();
            for pair in schedule.entries().windows(2) {
                assert!(pair[1].ending_balance <= pair[0].ending_balance);
                assert!(pair[1].cumulative_interest >= pair[0].cumulative_interest);
                assert!(pair[1].ending_balance >= 0.);
            }
        }
    }

    #[test]
    fn test_pmi_step_function() {
        let config = loan(40000., 0.065, 0.005);
        let schedule = build_schedule(&config, 0, 0.).unwrap();
        let charge = 760000. * 0.005 / 12.;

        let mut cancelled = false;
        for entry in schedule.entries() {
            let charged = entry.pmi_amount > 0.;
            assert_eq!(charged, entry.ending_balance / 800000. > 0.8);
            if charged {
                assert!(!cancelled, "pmi came back in month {}", entry.month_index);
                assert_relative_eq!(entry.pmi_amount, charge);
                assert_relative_eq!(entry.total_payment, entry.scheduled_payment + charge);
            } else {
                cancelled = true;
                assert_eq!(entry.total_payment, entry.scheduled_payment);
            }
        }
        assert!(schedule.pmi_months() > 0);
        assert!(schedule.pmi_months() < 360);
    }

    #[test]
    fn test_zero_rate_schedule() {
        let schedule = build_schedule(&loan(440000., 0., 0.), 0, 0.).unwrap();
        for entry in schedule.entries() {
            assert_eq!(entry.interest_portion, 0.);
            assert_relative_eq!(entry.principal_portion, 1000.);
        }
        assert_eq!(schedule.total_interest(), 0.);
        assert_abs_diff_eq!(schedule.final_balance(), 0., epsilon = 1e-6);
    }

    #[test]
    fn test_one_time_costs_and_offset() {
        let schedule = build_schedule(&loan(160000., 0.05, 0.), 7, 12500.).unwrap();
        assert_eq!(schedule.entries()[0].one_time_costs, 12500.);
        assert_eq!(schedule.one_time_costs(), 12500.);
        assert_eq!(schedule.first_year(), Some(7));
        assert_eq!(schedule.last_year(), Some(36));
        assert_eq!(schedule.entries()[12].year_index, 8);
        assert_eq!(schedule.balance_at_year(6), None);
        assert_eq!(
            schedule.balance_at_year(7),
            Some(schedule.entries()[11].ending_balance)
        );
    }

    #[test]
    fn test_unusable_loan_fails() {
        let paid_off = LoanConfiguration::new(800000., 800000., 0.065, 30).unwrap();
        assert!(matches!(
            build_schedule(&paid_off, 0, 0.),
            Err(LoanError::InvalidInput { .. })
        ));
    }
}
