use crate::config::LoanConfiguration;
use crate::error::{LoanError, Result};
use crate::schedule::{build_schedule, AmortizationSchedule};
use log::info;

/// Replace the tail of `original` from `cut_year` on with a new loan.
///
/// The new loan borrows the balance left at the end of `cut_year`, at
/// `new_config`'s rate and PMI terms, over whatever remains of the original
/// term. Its loan amount and term are taken from the original schedule, not from
/// `new_config`. `closing_costs` land on the first month of the new segment.
///
/// Month indices restart at 1 in the new segment while year indices continue,
/// so consumers group by year.
pub fn splice(
    original: &AmortizationSchedule,
    cut_year: u32,
    new_config: &LoanConfiguration,
    closing_costs: f64,
) -> Result<AmortizationSchedule> {
    let balance = original
        .balance_at_year(cut_year)
        .ok_or(LoanError::RefinanceYearOutOfRange {
            year: cut_year,
            first: original.first_year().unwrap_or(original.start_year()),
            last: original.last_year().unwrap_or(original.start_year()),
        })?;
    if !(closing_costs >= 0.) || !closing_costs.is_finite() {
        return Err(LoanError::invalid(
            "closing_costs",
            format!("closing costs must be non-negative, got {closing_costs}"),
        ));
    }

    let remaining_years = (original.start_year() + original.term_years()).saturating_sub(cut_year);
    let refinanced = new_config.refinanced(balance, new_config.annual_rate(), remaining_years)?;
    info!(
        "refinancing ${:.2} in year {} at {:.3}% over {} years",
        balance,
        cut_year,
        refinanced.annual_rate() * 100.,
        remaining_years
    );
    let segment = build_schedule(&refinanced, cut_year, closing_costs)?;

    let mut entries: Vec<_> = original
        .entries()
        .iter()
        .filter(|e| e.year_index < cut_year)
        .copied()
        .collect();
    entries.extend_from_slice(segment.entries());

    Ok(AmortizationSchedule::from_parts(
        original.start_year(),
        original.term_years(),
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::splice;
    use crate::config::LoanConfiguration;
    use crate::error::LoanError;
    use crate::schedule::build_schedule;
    use approx::assert_abs_diff_eq;
    use test_log::test;

    fn original() -> LoanConfiguration {
        LoanConfiguration::new(800000., 40000., 0.07, 30)
            .unwrap()
            .with_pmi_rate(0.005)
            .unwrap()
    }

    #[test]
    fn test_splice_keeps_prefix() {
        let config = original();
        let schedule = build_schedule(&config, 0, 0.).unwrap();
        let new_config = LoanConfiguration::new(800000., 0., 0.05, 30).unwrap();
        let spliced = splice(&schedule, 5, &new_config, 6000.).unwrap();

        // years 0..5 untouched, then 25 years of the new loan
        assert_eq!(spliced.len(), 60 + 300);
        assert_eq!(&spliced.entries()[..60], &schedule.entries()[..60]);
        let first_new = spliced.entries()[60];
        assert_eq!(first_new.month_index, 1);
        assert_eq!(first_new.year_index, 5);
        assert_eq!(first_new.one_time_costs, 6000.);
        assert_eq!(spliced.one_time_costs(), 6000.);
        assert_eq!(spliced.last_year(), schedule.last_year());
        assert_abs_diff_eq!(spliced.final_balance(), 0., epsilon = 1e-6);

        // the new segment borrows the balance at the end of the cut year
        let cut_balance = schedule.balance_at_year(5).unwrap();
        assert_abs_diff_eq!(first_new.beginning_balance(), cut_balance, epsilon = 1e-6);
        assert_abs_diff_eq!(first_new.interest_portion, cut_balance * 0.05 / 12., epsilon = 1e-6);
    }

    #[test]
    fn test_same_terms_keeps_trajectory() {
        let config = original();
        let schedule = build_schedule(&config, 0, 0.).unwrap();
        let spliced = splice(&schedule, 3, &config, 0.).unwrap();

        assert_eq!(spliced.balance_at_year(2), schedule.balance_at_year(2));
        let first_new = spliced.entries()[36];
        assert_abs_diff_eq!(
            first_new.beginning_balance(),
            schedule.balance_at_year(3).unwrap(),
            epsilon = 1e-6
        );
        // balance keeps falling across the splice
        for pair in spliced.entries().windows(2) {
            assert!(pair[1].ending_balance <= pair[0].ending_balance);
        }
    }

    #[test]
    fn test_pmi_follows_new_loan() {
        let config = original();
        let schedule = build_schedule(&config, 0, 0.).unwrap();
        // high LTV carried into the refinance keeps PMI, priced on the new loan
        let spliced = splice(&schedule, 1, &config, 0.).unwrap();
        let first_new = spliced.entries()[12];
        let new_loan = schedule.balance_at_year(1).unwrap();
        assert!(new_loan / 800000. > 0.8);
        assert_abs_diff_eq!(first_new.pmi_amount, new_loan * 0.005 / 12., epsilon = 1e-6);
    }

    #[test]
    fn test_cut_year_out_of_range() {
        let config = original();
        let schedule = build_schedule(&config, 0, 0.).unwrap();
        assert_eq!(
            splice(&schedule, 30, &config, 0.),
            Err(LoanError::RefinanceYearOutOfRange {
                year: 30,
                first: 0,
                last: 29
            })
        );
        assert!(matches!(
            splice(&schedule, 4, &config, -1.),
            Err(LoanError::InvalidInput { .. })
        ));
    }
}
