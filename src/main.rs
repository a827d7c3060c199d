use clap::{Parser, ValueEnum};
use loan_compare::summary::DEFAULT_CHECKPOINTS;
use loan_compare::*;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::process;

/// Compare two mortgage offers year by year, with an optional refinance
#[derive(Parser, Debug)]
#[command(name = "loan-compare", version)]
struct Cli {
    /// Home price ($)
    #[arg(long)]
    home_price: Option<f64>,
    /// Total cash available for down payment and points ($)
    #[arg(long)]
    total_cash: Option<f64>,
    /// Current market interest rate (%)
    #[arg(long)]
    market_rate: Option<f64>,
    /// Maximum down payment (% of home price)
    #[arg(long)]
    max_down_pct: Option<f64>,
    /// Maximum monthly payment including PMI ($)
    #[arg(long)]
    max_monthly: Option<f64>,
    /// Annual PMI rate (%)
    #[arg(long)]
    pmi_rate: Option<f64>,
    /// Loan term in years (1 to 50)
    #[arg(long)]
    term_years: Option<u32>,

    #[arg(long, value_enum, default_value = "standard")]
    loan_a: Strategy,
    #[arg(long, value_enum, default_value = "max-points")]
    loan_b: Strategy,
    /// Manual loan A down payment ($)
    #[arg(long)]
    down_payment_a: Option<f64>,
    /// Manual loan A interest rate (%)
    #[arg(long)]
    rate_a: Option<f64>,
    #[arg(long)]
    points_a: Option<f64>,
    /// Manual loan B down payment ($)
    #[arg(long)]
    down_payment_b: Option<f64>,
    /// Manual loan B interest rate (%)
    #[arg(long)]
    rate_b: Option<f64>,
    #[arg(long)]
    points_b: Option<f64>,

    /// Year in which to refinance
    #[arg(long, requires = "refi_rate")]
    refi_year: Option<u32>,
    /// Refinance interest rate (%)
    #[arg(long, requires = "refi_year")]
    refi_rate: Option<f64>,
    /// Refinance closing costs ($)
    #[arg(long, default_value_t = 0.)]
    refi_cost: f64,
    /// Which loans get refinanced
    #[arg(long, value_enum, default_value = "both")]
    refi_loan: RefiTarget,

    /// Print every month of each schedule
    #[arg(long)]
    schedule: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    Standard,
    Optimized,
    MaxPoints,
    Manual,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum RefiTarget {
    A,
    B,
    Both,
}

fn percent(value: Option<f64>) -> Option<f64> {
    value.map(|v| v / 100.)
}

fn loan_plan(
    strategy: Strategy,
    manual: (Option<f64>, Option<f64>, Option<f64>),
    refinance: Option<RefinancePlan>,
    suffix: &str,
) -> Result<LoanPlan> {
    let kind = match strategy {
        Strategy::Standard => LoanKind::Standard,
        Strategy::Optimized => LoanKind::Optimized,
        Strategy::MaxPoints => LoanKind::MaxPoints,
        Strategy::Manual => {
            let (down_payment, rate, points) = manual;
            LoanKind::Manual {
                down_payment: down_payment.ok_or(LoanError::MissingInput {
                    field: format!("down_payment_{suffix}"),
                })?,
                annual_rate: percent(rate).ok_or(LoanError::MissingInput {
                    field: format!("rate_{suffix}"),
                })?,
                discount_points: points.unwrap_or(0.),
            }
        }
    };
    let plan = LoanPlan::new(kind);
    Ok(match refinance {
        Some(refi) => plan.with_refinance(refi),
        None => plan,
    })
}

fn show_outcome(name: &str, outcome: &Result<LoanOutcome>, show_schedule: bool) {
    println!("Loan {}", name);
    match outcome {
        Err(err) => println!("  this scenario could not be computed: {}", err),
        Ok(LoanOutcome::Infeasible(reason)) => println!("  no feasible scenario: {}", reason),
        Ok(LoanOutcome::Computed(analysis)) => {
            println!("{}", analysis.details);
            if let Some(refinanced) = &analysis.refinanced {
                println!(
                    "  Refinanced: interest ${:.2} vs ${:.2} without refinancing",
                    refinanced.total_interest(),
                    analysis.schedule.total_interest()
                );
            }
            println!("  Balance by year:");
            for year in &analysis.rollup {
                println!("    {}", year);
            }
            if show_schedule {
                analysis.effective_schedule().show_amortization();
            }
        }
    }
    println!();
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("logger already initialized: {}", err);
    }

    let inputs = ScenarioInputs {
        home_price: cli.home_price,
        total_cash: cli.total_cash,
        market_rate: percent(cli.market_rate),
        max_down_pct: cli.max_down_pct,
        max_monthly: cli.max_monthly,
        pmi_rate: percent(cli.pmi_rate),
        term_years: cli.term_years,
    };
    let params = match inputs.validate() {
        Ok(params) => params,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(2);
        }
    };

    let refinance = match (cli.refi_year, percent(cli.refi_rate)) {
        (Some(year), Some(annual_rate)) => Some(RefinancePlan {
            year,
            annual_rate,
            closing_costs: cli.refi_cost,
        }),
        _ => None,
    };
    let refi_for = |target: RefiTarget| {
        refinance.filter(|_| cli.refi_loan == target || cli.refi_loan == RefiTarget::Both)
    };

    let plan_a = loan_plan(
        cli.loan_a,
        (cli.down_payment_a, cli.rate_a, cli.points_a),
        refi_for(RefiTarget::A),
        "a",
    );
    let plan_b = loan_plan(
        cli.loan_b,
        (cli.down_payment_b, cli.rate_b, cli.points_b),
        refi_for(RefiTarget::B),
        "b",
    );

    let (outcome_a, outcome_b, rows) = match (&plan_a, &plan_b) {
        (Ok(a), Ok(b)) => {
            let comparison = compare_loans(&params, a, b, &DEFAULT_CHECKPOINTS);
            (comparison.loan_a, comparison.loan_b, comparison.rows)
        }
        _ => {
            let evaluate = |plan: &Result<LoanPlan>| match plan {
                Ok(plan) => evaluate_loan(&params, plan, &DEFAULT_CHECKPOINTS),
                Err(err) => Err(err.clone()),
            };
            (evaluate(&plan_a), evaluate(&plan_b), None)
        }
    };

    show_outcome("A", &outcome_a, cli.schedule);
    show_outcome("B", &outcome_b, cli.schedule);

    match rows {
        Some(rows) => {
            println!("Loan Performance Over Time");
            for row in rows {
                println!("  {}", row);
            }
        }
        None => println!("No comparison: one or both loans have no scenario with the current inputs."),
    }

    if outcome_a.is_err() && outcome_b.is_err() {
        process::exit(1);
    }
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<ScheduleEntry>();
    is_normal::<AmortizationSchedule>();
    is_normal::<LoanConfiguration>();
    is_normal::<LoanOutcome>();
}
