use crate::metrics::config::MetricsConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicFlags {
    pub length_width_ratio: f64,
    pub is_elongated: bool,
    pub is_low_height: bool,
    pub cwd_score: f64,
}

/// Flags and ranking score of a CDW candidate.
///
/// `cwd_score` averages `ratio / 10` with how far the tallest return sits
/// below the low-height threshold. It is an uncalibrated ranking signal, not a
/// probability, and is not clamped: very elongated clusters score above 1.
/// An unknown height contributes nothing to the score and never flags the
/// cluster as low.
pub fn score(elongation: f64, hag_max_m: Option<f64>, config: &MetricsConfig) -> HeuristicFlags {
    let ratio = elongation;
    let low = config.low_height_threshold;

    let height_term = match hag_max_m {
        Some(hag_max) => (low - hag_max.min(low)) / low,
        None => 0.0,
    };
    let raw = (ratio / 10.0 + height_term) / 2.0;

    HeuristicFlags {
        length_width_ratio: ratio,
        is_elongated: ratio > config.elongation_threshold,
        is_low_height: hag_max_m.is_some_and(|h| h < low),
        cwd_score: round_to(raw, config.score_decimals),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
