use itertools::Itertools;

/// Cost weighting applied to raw miss / false-alarm counts inside the MODE
/// score. Identity by default; callers may plug any monotonic weighting.
pub type CostFunction = fn(f64) -> f64;

pub fn identity_cost(value: f64) -> f64 {
    value
}

/// One sample of the MODE curve: the score at a given confidence threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModePoint {
    pub confidence: f32,
    pub mode: f64,
}

/// One sample of the detection-error-tradeoff curve.
///
/// `rate_fa` is undefined when no reference area exists to normalize by;
/// `p_miss` is undefined when there are no reference objects.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetPoint {
    pub confidence: f32,
    pub rate_fa: Option<f64>,
    pub p_miss: Option<f64>,
}

/// Multiple-Object-Detection-Error: cost-weighted miss and false-alarm
/// counts normalized by the number of reference objects. Undefined when no
/// reference objects exist.
///
pub fn mode(
    correct: usize,
    miss: usize,
    false_alarm: usize,
    cmiss: CostFunction,
    cfa: CostFunction,
) -> Option<f64> {
    let references = correct + miss;
    if references == 0 {
        None
    } else {
        Some((cmiss(miss as f64) + cfa(false_alarm as f64)) / references as f64)
    }
}

/// Probability of missed detection. Undefined when no reference objects
/// exist.
pub fn p_miss(correct: usize, miss: usize, _false_alarm: usize) -> Option<f64> {
    let references = correct + miss;
    if references == 0 {
        None
    } else {
        Some(miss as f64 / references as f64)
    }
}

/// False-alarm rate: false alarms normalized by the reference localization
/// area. Undefined when the reference area is zero.
pub fn r_fa(
    _correct: usize,
    _miss: usize,
    false_alarm: usize,
    reference_area: f64,
) -> Option<f64> {
    if reference_area <= 0.0 {
        None
    } else {
        Some(false_alarm as f64 / reference_area)
    }
}

/// Interpolates the p_miss value of a DET curve at a target false-alarm
/// rate.
///
/// Points with an undefined coordinate are skipped. The usable points are
/// ordered by ascending `rate_fa` with duplicate rates collapsed to their
/// best (lowest) p_miss, and the curve is anchored at `(0.0, 1.0)`: an
/// operating point below the lowest measured rate interpolates towards "all
/// detections suppressed". A target beyond the highest measured rate is
/// unreachable and yields `None`.
///
pub fn p_miss_at_r_fa(det_points: &[DetPoint], target_rfa: f64) -> Option<f64> {
    let mut curve: Vec<(f64, f64)> = det_points
        .iter()
        .filter_map(|point| match (point.rate_fa, point.p_miss) {
            (Some(rate), Some(miss)) => Some((rate, miss)),
            _ => None,
        })
        .sorted_by(|a, b| a.partial_cmp(b).unwrap())
        .coalesce(|prev, next| {
            if prev.0 == next.0 {
                Ok((prev.0, prev.1.min(next.1)))
            } else {
                Err((prev, next))
            }
        })
        .collect();

    if curve.is_empty() || target_rfa < 0.0 {
        return None;
    }

    if curve[0].0 > 0.0 {
        curve.insert(0, (0.0, 1.0));
    }

    let (max_rate, _) = curve[curve.len() - 1];
    if target_rfa > max_rate {
        return None;
    }

    for window in curve.windows(2) {
        let (left_rate, left_miss) = window[0];
        let (right_rate, right_miss) = window[1];
        if target_rfa < left_rate || target_rfa > right_rate {
            continue;
        }
        if right_rate == left_rate {
            return Some(left_miss.min(right_miss));
        }
        let t = (target_rfa - left_rate) / (right_rate - left_rate);
        return Some(left_miss + t * (right_miss - left_miss));
    }

    // Single-point curve at exactly the target rate.
    curve
        .iter()
        .find(|(rate, _)| *rate == target_rfa)
        .map(|(_, miss)| *miss)
}

#[cfg(test)]
mod metrics_tests {
    use crate::metrics::{
        identity_cost, mode, p_miss, p_miss_at_r_fa, r_fa, DetPoint,
    };
    use crate::signal::region::approx;

    fn det(confidence: f32, rate_fa: f64, p_miss: f64) -> DetPoint {
        DetPoint {
            confidence,
            rate_fa: Some(rate_fa),
            p_miss: Some(p_miss),
        }
    }

    #[test]
    fn mode_is_undefined_without_references() {
        assert_eq!(mode(0, 0, 3, identity_cost, identity_cost), None);
    }

    #[test]
    fn mode_weights_miss_and_false_alarm_counts() {
        let score = mode(2, 1, 3, identity_cost, identity_cost).unwrap();
        assert!(approx(score, (1.0 + 3.0) / 3.0));

        fn double(value: f64) -> f64 {
            2.0 * value
        }
        let weighted = mode(2, 1, 3, double, identity_cost).unwrap();
        assert!(approx(weighted, (2.0 + 3.0) / 3.0));
    }

    #[test]
    fn p_miss_counts_misses_against_references() {
        assert_eq!(p_miss(0, 0, 5), None);
        assert!(approx(p_miss(3, 1, 0).unwrap(), 0.25));
    }

    #[test]
    fn r_fa_normalizes_by_reference_area() {
        assert_eq!(r_fa(1, 1, 4, 0.0), None);
        assert!(approx(r_fa(1, 1, 4, 8.0).unwrap(), 0.5));
    }

    #[test]
    fn interpolation_between_curve_points() {
        let points = vec![det(0.9, 0.1, 0.8), det(0.4, 0.5, 0.2)];
        // halfway between the two measured rates
        let interpolated = p_miss_at_r_fa(&points, 0.3).unwrap();
        assert!(approx(interpolated, 0.5));
        // exact hit
        assert!(approx(p_miss_at_r_fa(&points, 0.5).unwrap(), 0.2));
    }

    #[test]
    fn target_below_curve_interpolates_from_anchor() {
        let points = vec![det(0.9, 0.2, 0.5)];
        // anchored at (0.0, 1.0)
        let interpolated = p_miss_at_r_fa(&points, 0.1).unwrap();
        assert!(approx(interpolated, 0.75));
    }

    #[test]
    fn unreachable_target_is_undefined() {
        let points = vec![det(0.9, 0.2, 0.5)];
        assert_eq!(p_miss_at_r_fa(&points, 0.5), None);
        assert_eq!(p_miss_at_r_fa(&[], 0.1), None);
    }

    #[test]
    fn undefined_points_are_skipped() {
        let points = vec![
            DetPoint {
                confidence: 0.5,
                rate_fa: None,
                p_miss: Some(0.3),
            },
            det(0.4, 0.4, 0.2),
        ];
        assert!(approx(p_miss_at_r_fa(&points, 0.4).unwrap(), 0.2));
    }
}
