use crate::config::{check_term, LoanConfiguration, OptimizerSettings};
use crate::error::{LoanError, Result};
use crate::optimizer::{find_best_configuration_with, max_points_configuration, standard_configuration};
use crate::refinance::splice;
use crate::schedule::{build_schedule, AmortizationSchedule};
use crate::summary::{annual_rollup, compare_checkpoints, summarize_at_checkpoints, AnnualRollup, ComparisonRow, LoanDetails, YearlySummary};
use crate::validate::{check_feasibility, Rejection};
use log::{info, warn};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_TERM_YEARS: u32 = 30;

/// Raw constraints as collected from the user. `None` means the value was not
/// given, which is not the same as zero. Rates are decimal fractions.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioInputs {
    pub home_price: Option<f64>,
    pub total_cash: Option<f64>,
    pub market_rate: Option<f64>,
    pub max_down_pct: Option<f64>,
    pub max_monthly: Option<f64>,
    pub pmi_rate: Option<f64>,
    pub term_years: Option<u32>,
}

impl ScenarioInputs {
    pub fn validate(&self) -> Result<ScenarioParameters> {
        let home_price = required("home_price", self.home_price)?;
        if !(home_price > 0.) {
            return Err(LoanError::invalid("home_price", "home price must be positive"));
        }
        let max_down_pct = required("max_down_pct", self.max_down_pct)?;
        if !(0. ..=100.).contains(&max_down_pct) {
            return Err(LoanError::invalid(
                "max_down_pct",
                format!("must be a percentage between 0 and 100, got {max_down_pct}"),
            ));
        }
        let term_years = self.term_years.unwrap_or(DEFAULT_TERM_YEARS);
        check_term(term_years)?;

        Ok(ScenarioParameters {
            home_price,
            total_cash: non_negative("total_cash", required("total_cash", self.total_cash)?)?,
            market_rate: non_negative("market_rate", required("market_rate", self.market_rate)?)?,
            max_down_pct,
            max_monthly: non_negative("max_monthly", required("max_monthly", self.max_monthly)?)?,
            pmi_rate: non_negative("pmi_rate", required("pmi_rate", self.pmi_rate)?)?,
            term_years,
            settings: OptimizerSettings::default(),
        })
    }
}

fn required(field: &str, value: Option<f64>) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(LoanError::invalid(field, format!("not a number: {v}"))),
        None => Err(LoanError::missing(field)),
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64> {
    if value < 0. {
        return Err(LoanError::invalid(field, format!("must not be negative, got {value}")));
    }
    Ok(value)
}

/// Validated constraints shared by both loans of a comparison.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioParameters {
    pub home_price: f64,
    pub total_cash: f64,
    pub market_rate: f64,
    pub max_down_pct: f64,
    pub max_monthly: f64,
    pub pmi_rate: f64,
    pub term_years: u32,
    pub settings: OptimizerSettings,
}

/// How a loan's configuration is arrived at.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LoanKind {
    /// largest affordable down payment at the market rate
    Standard,
    /// point search for the largest feasible down payment
    Optimized,
    /// minimum down payment, remaining cash spent on points
    MaxPoints,
    Manual {
        down_payment: f64,
        annual_rate: f64,
        discount_points: f64,
    },
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RefinancePlan {
    pub year: u32,
    pub annual_rate: f64,
    pub closing_costs: f64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoanPlan {
    pub kind: LoanKind,
    pub refinance: Option<RefinancePlan>,
}

impl LoanPlan {
    pub fn new(kind: LoanKind) -> Self {
        Self { kind, refinance: None }
    }

    pub fn with_refinance(self, refinance: RefinancePlan) -> Self {
        Self {
            refinance: Some(refinance),
            ..self
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Infeasibility {
    /// the point search found nothing within the constraints
    NoConfiguration,
    Rejected(Rejection),
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::NoConfiguration => write!(f, "no down payment and point combination fits the constraints"),
            Infeasibility::Rejected(rejection) => write!(f, "{}", rejection),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct LoanAnalysis {
    pub config: LoanConfiguration,
    pub details: LoanDetails,
    pub schedule: AmortizationSchedule,
    pub refinanced: Option<AmortizationSchedule>,
    pub checkpoints: Vec<YearlySummary>,
    pub rollup: Vec<AnnualRollup>,
}

impl LoanAnalysis {
    /// The refinanced schedule when there is one, otherwise the original.
    pub fn effective_schedule(&self) -> &AmortizationSchedule {
        self.refinanced.as_ref().unwrap_or(&self.schedule)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum LoanOutcome {
    Infeasible(Infeasibility),
    Computed(Box<LoanAnalysis>),
}

impl LoanOutcome {
    pub fn analysis(&self) -> Option<&LoanAnalysis> {
        match self {
            LoanOutcome::Computed(analysis) => Some(analysis.as_ref()),
            LoanOutcome::Infeasible(_) => None,
        }
    }
}

fn configure(params: &ScenarioParameters, kind: &LoanKind) -> Result<Option<LoanConfiguration>> {
    match *kind {
        LoanKind::Standard => standard_configuration(
            params.home_price,
            params.max_down_pct,
            params.total_cash,
            params.market_rate,
            params.pmi_rate,
            params.term_years,
        )
        .map(Some),
        LoanKind::Optimized => find_best_configuration_with(
            &params.settings,
            params.home_price,
            params.max_down_pct,
            params.total_cash,
            params.max_monthly,
            params.pmi_rate,
            params.market_rate,
            params.term_years,
        ),
        LoanKind::MaxPoints => max_points_configuration(
            &params.settings,
            params.home_price,
            params.total_cash,
            params.market_rate,
            params.pmi_rate,
            params.term_years,
        )
        .map(Some),
        LoanKind::Manual {
            down_payment,
            annual_rate,
            discount_points,
        } => LoanConfiguration::new(params.home_price, down_payment, annual_rate, params.term_years)?
            .with_discount_points_at(discount_points, params.settings.point_price)?
            .with_pmi_rate(params.pmi_rate)
            .map(Some),
    }
}

/// Configure, check and expand one loan. Stops before building a schedule
/// when the loan is infeasible.
pub fn evaluate_loan(params: &ScenarioParameters, plan: &LoanPlan, checkpoint_years: &[u32]) -> Result<LoanOutcome> {
    let config = match configure(params, &plan.kind)? {
        Some(config) => config,
        None => {
            warn!("{:?} loan: no feasible configuration", plan.kind);
            return Ok(LoanOutcome::Infeasible(Infeasibility::NoConfiguration));
        }
    };

    let payment = if config.loan_amount() > 0. {
        config.monthly_pi_payment()?
    } else {
        0.
    };
    if let Err(rejection) = check_feasibility(&config, payment, params.max_monthly, params.total_cash) {
        warn!("{:?} loan rejected: {}", plan.kind, rejection);
        return Ok(LoanOutcome::Infeasible(Infeasibility::Rejected(rejection)));
    }

    let schedule = build_schedule(&config, 0, config.point_cost())?;
    let refinanced = match plan.refinance {
        Some(refi) => {
            let new_config = LoanConfiguration::new(
                config.home_price(),
                config.down_payment(),
                refi.annual_rate,
                config.term_years(),
            )?
            .with_pmi_rate(config.pmi_annual_rate())?;
            Some(splice(&schedule, refi.year, &new_config, refi.closing_costs)?)
        }
        None => None,
    };
    let details = LoanDetails::new(&config, &schedule)?;
    let effective = refinanced.as_ref().unwrap_or(&schedule);
    let checkpoints = summarize_at_checkpoints(effective, checkpoint_years);
    let rollup = annual_rollup(effective);
    info!("{:?} loan: {}", plan.kind, config);

    Ok(LoanOutcome::Computed(Box::new(LoanAnalysis {
        config,
        details,
        schedule,
        refinanced,
        checkpoints,
        rollup,
    })))
}

/// Both loans of a comparison. Each loan stands on its own: an error or an
/// infeasible result for one leaves the other intact.
#[derive(Clone, PartialEq, Debug)]
pub struct Comparison {
    pub loan_a: Result<LoanOutcome>,
    pub loan_b: Result<LoanOutcome>,
    /// only present when both loans were computed
    pub rows: Option<Vec<ComparisonRow>>,
}

pub fn compare_loans(
    params: &ScenarioParameters,
    loan_a: &LoanPlan,
    loan_b: &LoanPlan,
    checkpoint_years: &[u32],
) -> Comparison {
    let loan_a = evaluate_loan(params, loan_a, checkpoint_years);
    let loan_b = evaluate_loan(params, loan_b, checkpoint_years);
    for (name, outcome) in [("A", &loan_a), ("B", &loan_b)] {
        if let Err(err) = outcome {
            warn!("loan {} could not be computed: {}", name, err);
        }
    }

    let rows = match (&loan_a, &loan_b) {
        (Ok(LoanOutcome::Computed(a)), Ok(LoanOutcome::Computed(b))) => Some(compare_checkpoints(
            a.effective_schedule(),
            b.effective_schedule(),
            checkpoint_years,
        )),
        _ => None,
    };

    Comparison { loan_a, loan_b, rows }
}
