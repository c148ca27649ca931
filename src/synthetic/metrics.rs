//! Time-varying synthetic metrics
//!
//! Values are a fixed base set scaled by two slow sine oscillators of the
//! wall clock. Calls a few seconds apart see nearly identical numbers while
//! minutes apart drift smoothly.

use crate::model::{
    round_cents, ChartDataPoint, MetricsData, Trends, CONVERSION_RATE_RANGE,
};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use rand::Rng;

/// Base values the oscillators modulate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseMetrics {
    pub payments: f64,
    pub errors: f64,
    pub revenue: f64,
    pub conversion_rate: f64,
    pub active_users: f64,
}

impl Default for BaseMetrics {
    fn default() -> Self {
        Self {
            payments: 1247.0,
            errors: 23.0,
            revenue: 45678.90,
            conversion_rate: 3.2,
            active_users: 892.0,
        }
    }
}

/// Number of daily points in the chart series
pub const CHART_DAYS: i64 = 30;

const LONG_PERIOD: f64 = 1_000_000.0;
const SHORT_PERIOD: f64 = 100_000.0;
const TREND_PERIOD: f64 = 500_000.0;

/// Long-period oscillator, within 1 ± 5%
pub fn long_wave(now_ms: i64) -> f64 {
    (now_ms as f64 / LONG_PERIOD).sin() * 0.05 + 1.0
}

/// Short-period oscillator, within 1 ± 2%
pub fn short_wave(now_ms: i64) -> f64 {
    (now_ms as f64 / SHORT_PERIOD).sin() * 0.02 + 1.0
}

fn trend_seed(now_ms: i64) -> f64 {
    (now_ms as f64 / TREND_PERIOD).sin()
}

/// Headline metrics plus a 30-day chart series at `now`
pub fn generate_metrics<R: Rng>(base: &BaseMetrics, now: DateTime<Utc>, rng: &mut R) -> MetricsData {
    let now_ms = now.timestamp_millis();
    let long = long_wave(now_ms);
    let short = short_wave(now_ms);
    let scale = long * short;

    let payments = (base.payments * scale).round().max(0.0) as u64;
    let errors = (base.errors * short).round().max(0.0) as u64;
    let transactions = payments + errors + (long * 20.0).floor().max(0.0) as u64;
    let revenue = round_cents((base.revenue * scale).max(0.0));
    let active_users = (base.active_users * scale).round().max(0.0) as u64;
    let conversion_rate =
        (base.conversion_rate * short).clamp(CONVERSION_RATE_RANGE.0, CONVERSION_RATE_RANGE.1);

    let success_rate = if transactions == 0 {
        0.0
    } else {
        payments as f64 / transactions as f64 * 100.0
    };
    let average_amount = if payments == 0 {
        0.0
    } else {
        round_cents(revenue / payments as f64)
    };

    let seed = trend_seed(now_ms);

    MetricsData {
        payments,
        errors,
        transactions,
        revenue,
        conversion_rate,
        success_rate,
        error_rate: MetricsData::error_rate_of(errors, transactions),
        average_amount,
        active_users,
        top_tokens: vec!["ckBTC".to_string(), "ICP".to_string(), "ckETH".to_string()],
        chart_data: generate_chart(payments, errors, revenue, active_users, now, rng),
        trends: Trends {
            payments_change: seed * 8.0,
            errors_change: seed * -4.0,
            revenue_change: seed * 6.0,
            users_change: seed * 10.0,
        },
    }
}

/// Daily series ending today
///
/// Each day applies a weekend dip, a mild upward trend and ±20% noise to
/// the daily share of the headline totals.
pub fn generate_chart<R: Rng>(
    payments: u64,
    errors: u64,
    revenue: f64,
    users: u64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<ChartDataPoint> {
    let days = CHART_DAYS as f64;

    (0..CHART_DAYS)
        .rev()
        .map(|days_ago| {
            let day = (now - Duration::days(days_ago)).date_naive();
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            let weekend_multiplier = if weekend { 0.7 } else { 1.0 };
            let trend_multiplier = 1.0 + (CHART_DAYS - 1 - days_ago) as f64 * 0.002;
            let noise = rng.gen_range(0.8..1.2);
            let daily = weekend_multiplier * trend_multiplier * noise;
            let error_noise = rng.gen_range(0.75..1.25);

            let start_of_day = day
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
                .unwrap_or_default();

            ChartDataPoint {
                date: day.format("%Y-%m-%d").to_string(),
                payments: (payments as f64 / days * daily).round() as u64,
                errors: (errors as f64 / days * daily * error_noise).round() as u64,
                revenue: round_cents(revenue / days * daily),
                users: (users as f64 / days * daily).round() as u64,
                timestamp: start_of_day,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn test_oscillator_bounds() {
        for ms in (0..50_000_000i64).step_by(777_777) {
            let long = long_wave(ms);
            let short = short_wave(ms);
            assert!((0.95..=1.05).contains(&long));
            assert!((0.98..=1.02).contains(&short));
        }
    }

    #[test]
    fn test_metrics_stable_over_short_window() {
        let base = BaseMetrics::default();
        let t = 1_700_000_000_000;
        let a = generate_metrics(&base, at(t), &mut StdRng::seed_from_u64(1));
        let b = generate_metrics(&base, at(t + 1_000), &mut StdRng::seed_from_u64(1));

        let drift = (a.payments as i64 - b.payments as i64).abs();
        assert!(drift <= 1, "payments drifted by {}", drift);
        assert!((a.revenue - b.revenue).abs() < 50.0);
    }

    #[test]
    fn test_metrics_invariants() {
        let base = BaseMetrics::default();
        let mut rng = StdRng::seed_from_u64(7);

        for step in 0..40 {
            let now = at(1_700_000_000_000 + step * 3_600_000);
            let m = generate_metrics(&base, now, &mut rng);

            assert!(m.transactions >= m.payments + m.errors);
            assert!(m.revenue >= 0.0);
            assert!(m.conversion_rate >= CONVERSION_RATE_RANGE.0);
            assert!(m.conversion_rate <= CONVERSION_RATE_RANGE.1);
            assert!((0.0..=100.0).contains(&m.success_rate));
            assert!(m.trends.payments_change.abs() <= 8.0);
            assert_eq!(m.chart_data.len(), CHART_DAYS as usize);
        }
    }

    #[test]
    fn test_chart_series_shape() {
        let now = at(1_700_000_000_000);
        let chart = generate_chart(3000, 60, 90_000.0, 900, now, &mut StdRng::seed_from_u64(3));

        assert_eq!(chart.len(), 30);
        assert_eq!(chart.last().unwrap().date, "2023-11-14");
        assert_eq!(chart.first().unwrap().date, "2023-10-16");
        assert!(chart.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(chart.iter().all(|p| p.revenue >= 0.0));

        // 100 payments/day base; weekend dip and noise keep it within 50..=130
        assert!(chart.iter().all(|p| (50..=130).contains(&p.payments)));
    }
}
