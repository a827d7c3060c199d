use crate::config::{LoanConfiguration, OptimizerSettings};
use crate::error::{LoanError, Result};
use crate::validate::check_feasibility;
use log::{debug, info, trace};

/// Smallest down payment the max-points loan will put down, as a fraction of
/// the home price.
const MAX_POINTS_DOWN_FRACTION: f64 = 0.0351;

/// Search down payments from the largest affordable one downward and, for each,
/// point counts from zero upward. The first combination whose P&I plus PMI fits
/// under `max_monthly` with cash to spare for the down payment and the points
/// wins. Rates are decimal fractions; `max_down_pct` is a percentage.
#[allow(clippy::too_many_arguments)]
pub fn find_best_configuration(
    home_price: f64,
    max_down_pct: f64,
    total_cash: f64,
    max_monthly: f64,
    pmi_annual_rate: f64,
    base_rate: f64,
    term_years: u32,
) -> Result<Option<LoanConfiguration>> {
    find_best_configuration_with(
        &OptimizerSettings::default(),
        home_price,
        max_down_pct,
        total_cash,
        max_monthly,
        pmi_annual_rate,
        base_rate,
        term_years,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn find_best_configuration_with(
    settings: &OptimizerSettings,
    home_price: f64,
    max_down_pct: f64,
    total_cash: f64,
    max_monthly: f64,
    pmi_annual_rate: f64,
    base_rate: f64,
    term_years: u32,
) -> Result<Option<LoanConfiguration>> {
    check_non_negative("max_down_pct", max_down_pct)?;
    check_non_negative("total_cash", total_cash)?;
    check_non_negative("max_monthly", max_monthly)?;
    if !(settings.cash_step > 0.) {
        return Err(LoanError::invalid("cash_step", "search step must be positive"));
    }
    // validates price, rates and term before the grid is walked
    LoanConfiguration::new(home_price, 0., base_rate, term_years)?.with_pmi_rate(pmi_annual_rate)?;

    let max_down = (home_price * max_down_pct / 100.).min(total_cash);
    let min_down = home_price * settings.min_down_fraction;
    if max_down < min_down {
        info!(
            "no down payment between ${:.2} and ${:.2}, nothing to search",
            min_down, max_down
        );
        return Ok(None);
    }

    let steps = ((max_down - min_down) / settings.cash_step).floor() as u32;
    debug!(
        "searching {} down payments from ${:.2} down to ${:.2}, up to {} points each",
        steps + 1,
        max_down,
        min_down,
        settings.max_points
    );

    for step in 0..=steps {
        let down_payment = max_down - step as f64 * settings.cash_step;
        let loan_amount = home_price - down_payment;
        if !(loan_amount > 0.) {
            continue;
        }

        for points in 0..=settings.max_points {
            let rate = settings.discounted_rate(base_rate, points);
            let point_cost = loan_amount * points as f64 * settings.point_price;
            let config = LoanConfiguration::new(home_price, down_payment, rate, term_years)?
                .with_points(points as f64, point_cost)?
                .with_pmi_rate(pmi_annual_rate)?;
            let payment = config.monthly_pi_payment()?;

            match check_feasibility(&config, payment, max_monthly, total_cash) {
                Ok(()) => {
                    info!("best configuration: {}", config);
                    return Ok(Some(config));
                }
                Err(rejection) => trace!(
                    "down ${:.2}, {} points: {}",
                    down_payment,
                    points,
                    rejection
                ),
            }
        }
    }

    info!("no feasible down payment and point combination");
    Ok(None)
}

/// Largest affordable down payment at the market rate, no points.
pub fn standard_configuration(
    home_price: f64,
    max_down_pct: f64,
    total_cash: f64,
    market_rate: f64,
    pmi_annual_rate: f64,
    term_years: u32,
) -> Result<LoanConfiguration> {
    check_non_negative("max_down_pct", max_down_pct)?;
    check_non_negative("total_cash", total_cash)?;
    let down_payment = (home_price * max_down_pct / 100.).min(total_cash);
    LoanConfiguration::new(home_price, down_payment, market_rate, term_years)?
        .with_pmi_rate(pmi_annual_rate)
}

/// Minimum down payment, with every whole point the remaining cash buys.
pub fn max_points_configuration(
    settings: &OptimizerSettings,
    home_price: f64,
    total_cash: f64,
    market_rate: f64,
    pmi_annual_rate: f64,
    term_years: u32,
) -> Result<LoanConfiguration> {
    check_non_negative("total_cash", total_cash)?;
    let down_payment = home_price * MAX_POINTS_DOWN_FRACTION.max(settings.min_down_fraction);
    let base = LoanConfiguration::new(home_price, down_payment, market_rate, term_years)?;

    let price_per_point = base.loan_amount() * settings.point_price;
    let available = total_cash - down_payment;
    let points = if price_per_point > 0. && available > 0. {
        ((available / price_per_point).floor() as u32).min(settings.max_points)
    } else {
        0
    };
    debug!(
        "${:.2} left after down payment buys {} points at ${:.2} each",
        available, points, price_per_point
    );

    LoanConfiguration::new(
        home_price,
        down_payment,
        settings.discounted_rate(market_rate, points),
        term_years,
    )?
    .with_points(points as f64, price_per_point * points as f64)?
    .with_pmi_rate(pmi_annual_rate)
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !(value >= 0.) || !value.is_finite() {
        return Err(LoanError::invalid(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}
