pub mod config;
pub mod error;
pub mod optimizer;
pub mod payment;
pub mod refinance;
pub mod scenario;
pub mod schedule;
pub mod summary;
pub mod validate;

pub use config::{LoanConfiguration, OptimizerSettings, MAX_TERM_YEARS};
pub use error::{LoanError, Result};
pub use optimizer::{find_best_configuration, max_points_configuration, standard_configuration};
pub use payment::monthly_payment;
pub use refinance::splice;
pub use scenario::{
    compare_loans, evaluate_loan, Comparison, Infeasibility, LoanAnalysis, LoanKind, LoanOutcome,
    LoanPlan, RefinancePlan, ScenarioInputs, ScenarioParameters,
};
pub use schedule::{build_schedule, AmortizationSchedule, ScheduleEntry};
pub use summary::{annual_rollup, summarize_at_checkpoints, AnnualRollup, LoanDetails, YearlySummary};
pub use validate::is_valid;
