use crate::config::LoanConfiguration;
use crate::error::Result;
use crate::schedule::AmortizationSchedule;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Checkpoint years shown in a loan comparison.
pub const DEFAULT_CHECKPOINTS: [u32; 5] = [3, 5, 10, 15, 30];

/// Position of one loan after `year` years.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct YearlySummary {
    pub year: u32,
    /// monthly payments including PMI made before `year`
    pub total_payment: f64,
    pub total_interest: f64,
    pub remaining_balance: f64,
}

/// Reduce a schedule to cumulative totals at each checkpoint year. The balance
/// is the one at the end of the checkpoint year; past the end of the schedule
/// it is the schedule's final balance.
pub fn summarize_at_checkpoints(schedule: &AmortizationSchedule, checkpoint_years: &[u32]) -> Vec<YearlySummary> {
    checkpoint_years
        .iter()
        .map(|&year| {
            let (total_payment, total_interest) = schedule
                .entries()
                .iter()
                .filter(|e| e.year_index < year)
                .fold((0., 0.), |(paid, interest), e| {
                    (paid + e.total_payment, interest + e.interest_portion)
                });
            let remaining_balance = match schedule.balance_at_year(year) {
                Some(balance) => balance,
                None if schedule.first_year().is_some_and(|first| year < first) => {
                    schedule.entries()[0].beginning_balance()
                }
                None => schedule.final_balance(),
            };

            YearlySummary {
                year,
                total_payment,
                total_interest,
                remaining_balance,
            }
        })
        .collect()
}

/// Totals for one calendar year of a schedule, for charting balance over time.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnualRollup {
    pub year: u32,
    pub principal: f64,
    pub interest: f64,
    pub total_payment: f64,
    pub pmi: f64,
    pub one_time_costs: f64,
    pub ending_balance: f64,
}

impl fmt::Display for AnnualRollup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year {}, principal ${:.2}, interest ${:.2}, pmi ${:.2}, paid ${:.2}, costs ${:.2}, ending balance ${:.2}",
            self.year,
            self.principal,
            self.interest,
            self.pmi,
            self.total_payment,
            self.one_time_costs,
            self.ending_balance
        )
    }
}

pub fn annual_rollup(schedule: &AmortizationSchedule) -> Vec<AnnualRollup> {
    let mut years: BTreeMap<u32, AnnualRollup> = BTreeMap::new();
    for entry in schedule.entries() {
        let rollup = years.entry(entry.year_index).or_insert(AnnualRollup {
            year: entry.year_index,
            ..AnnualRollup::default()
        });
        rollup.principal += entry.principal_portion;
        rollup.interest += entry.interest_portion;
        rollup.total_payment += entry.total_payment;
        rollup.pmi += entry.pmi_amount;
        rollup.one_time_costs += entry.one_time_costs;
        rollup.ending_balance = entry.ending_balance;
    }
    years.into_values().collect()
}

/// Headline figures for one loan.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoanDetails {
    pub home_price: f64,
    pub down_payment: f64,
    pub down_payment_pct: f64,
    pub loan_amount: f64,
    pub annual_rate: f64,
    pub discount_points: f64,
    pub closing_cost: f64,
    pub pmi_annual_rate: f64,
    pub pmi_at_start: f64,
    pub pmi_months: usize,
    pub monthly_pi_payment: f64,
    pub total_monthly_payment: f64,
}

impl LoanDetails {
    pub fn new(config: &LoanConfiguration, schedule: &AmortizationSchedule) -> Result<Self> {
        let monthly_pi_payment = config.monthly_pi_payment()?;
        let pmi_at_start = config.pmi_at_origination();
        Ok(Self {
            home_price: config.home_price(),
            down_payment: config.down_payment(),
            down_payment_pct: config.down_payment_pct(),
            loan_amount: config.loan_amount(),
            annual_rate: config.annual_rate(),
            discount_points: config.discount_points(),
            closing_cost: config.point_cost(),
            pmi_annual_rate: config.pmi_annual_rate(),
            pmi_at_start,
            pmi_months: schedule.pmi_months(),
            monthly_pi_payment,
            total_monthly_payment: monthly_pi_payment + pmi_at_start,
        })
    }
}

impl fmt::Display for LoanDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Home Price:             ${:.0}", self.home_price)?;
        writeln!(
            f,
            "  Down Payment:           ${:.0} ({:.2}%)",
            self.down_payment, self.down_payment_pct
        )?;
        writeln!(f, "  Loan Amount:            ${:.0}", self.loan_amount)?;
        writeln!(f, "  Interest Rate:          {:.2}%", self.annual_rate * 100.)?;
        writeln!(f, "  Discount Points:        {}", self.discount_points)?;
        writeln!(f, "  Closing Cost:           ${:.2}", self.closing_cost)?;
        writeln!(f, "  PMI Rate:               {:.3}%", self.pmi_annual_rate * 100.)?;
        writeln!(f, "  PMI (monthly estimate): ${:.2}", self.pmi_at_start)?;
        writeln!(f, "  PMI Months:             {}", self.pmi_months)?;
        writeln!(f, "  P&I Monthly Payment:    ${:.2}", self.monthly_pi_payment)?;
        write!(f, "  Total Monthly Payment:  ${:.2}", self.total_monthly_payment)
    }
}

/// Two loans side by side at one checkpoint year.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonRow {
    pub year: u32,
    pub loan_a: YearlySummary,
    pub loan_b: YearlySummary,
}

impl ComparisonRow {
    /// Positive when loan B has cost less in payments so far.
    pub fn payment_savings(&self) -> f64 {
        self.loan_a.total_payment - self.loan_b.total_payment
    }
}

impl fmt::Display for ComparisonRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} years | A paid ${:>10.0} interest ${:>10.0} balance ${:>10.0} | B paid ${:>10.0} interest ${:>10.0} balance ${:>10.0}",
            self.year,
            self.loan_a.total_payment,
            self.loan_a.total_interest,
            self.loan_a.remaining_balance,
            self.loan_b.total_payment,
            self.loan_b.total_interest,
            self.loan_b.remaining_balance
        )
    }
}

pub fn compare_checkpoints(
    loan_a: &AmortizationSchedule,
    loan_b: &AmortizationSchedule,
    checkpoint_years: &[u32],
) -> Vec<ComparisonRow> {
    summarize_at_checkpoints(loan_a, checkpoint_years)
        .into_iter()
        .zip(summarize_at_checkpoints(loan_b, checkpoint_years))
        .map(|(a, b)| ComparisonRow {
            year: a.year,
            loan_a: a,
            loan_b: b,
        })
        .collect()
}
