//! SCS curve-number runoff and the distributed per-point calculator.
//!
//! The same curve-number formula backs both the per-point visualization
//! layer and the basin discharge estimate; depths are in millimetres.

use crate::model::{CatchmentPoint, RunoffPoint, RunoffStatus};
use crate::registry::CatchmentRegistry;
use rand::Rng;

/// Points at or below this runoff depth are not reported.
pub const ACTIVE_RUNOFF_MM: f64 = 5.0;
/// Runoff above this depth marks a point as elevated.
pub const ELEVATED_RUNOFF_MM: f64 = 15.0;
/// Runoff above this depth marks a point as high.
pub const HIGH_RUNOFF_MM: f64 = 35.0;

/// Potential maximum retention S and initial abstraction Ia for a curve number.
pub fn scs_constants(curve_number: f64) -> (f64, f64) {
    let retention = 25400.0 / curve_number - 254.0;
    (retention, 0.2 * retention)
}

/// Runoff depth for a rainfall depth given precomputed S and Ia.
///
/// Zero up to and including Ia, `(P - Ia)^2 / (P - Ia + S)` above it.
pub fn runoff_depth(rain_mm: f64, retention_mm: f64, initial_abstraction_mm: f64) -> f64 {
    if rain_mm <= initial_abstraction_mm {
        return 0.0;
    }
    let excess = rain_mm - initial_abstraction_mm;
    excess * excess / (excess + retention_mm)
}

/// Runoff depth for a rainfall depth and a curve number.
pub fn scs_runoff(rain_mm: f64, curve_number: f64) -> f64 {
    let (s, ia) = scs_constants(curve_number);
    runoff_depth(rain_mm, s, ia)
}

pub fn classify_runoff(runoff_mm: f64) -> RunoffStatus {
    if runoff_mm > HIGH_RUNOFF_MM {
        RunoffStatus::High
    } else if runoff_mm > ELEVATED_RUNOFF_MM {
        RunoffStatus::Elevated
    } else {
        RunoffStatus::Normal
    }
}

fn point_runoff(point: &CatchmentPoint, basin_rain_mm: f64) -> f64 {
    let local_rain = basin_rain_mm * point.rain_weight;
    runoff_depth(local_rain, point.retention_mm, point.initial_abstraction_mm)
}

/// Runoff for every registry point above the activity threshold, in registry order.
pub fn compute(registry: &CatchmentRegistry, basin_rain_mm: f64) -> Vec<RunoffPoint> {
    registry
        .points()
        .iter()
        .filter_map(|point| {
            let runoff_mm = point_runoff(point, basin_rain_mm);
            (runoff_mm > ACTIVE_RUNOFF_MM).then(|| RunoffPoint {
                lat: point.lat,
                lon: point.lon,
                runoff_mm,
                status: classify_runoff(runoff_mm),
                elevation: point.elevation_m,
            })
        })
        .collect()
}

/// Uniformly subsample `points` down to `cap` entries.
///
/// Every point has the same chance of being kept regardless of its status.
/// Retained points keep their relative order.
pub fn sample_points<R: Rng + ?Sized>(points: Vec<RunoffPoint>, cap: usize, rng: &mut R) -> Vec<RunoffPoint> {
    if points.len() <= cap {
        return points;
    }

    let mut keep = rand::seq::index::sample(rng, points.len(), cap).into_vec();
    keep.sort_unstable();

    let mut keep = keep.into_iter().peekable();
    points
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(p)
            } else {
                None
            }
        })
        .collect()
}

/// `compute` followed by `sample_points`: the response-sized point list.
pub fn compute_capped<R: Rng + ?Sized>(
    registry: &CatchmentRegistry,
    basin_rain_mm: f64,
    cap: usize,
    rng: &mut R,
) -> Vec<RunoffPoint> {
    sample_points(compute(registry, basin_rain_mm), cap, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn point(id: i64, cn: f64, rain_weight: f64) -> CatchmentPoint {
        let (s, ia) = scs_constants(cn);
        CatchmentPoint {
            id,
            lat: 29.95 + id as f64 * 1e-4,
            lon: 78.17,
            elevation_m: 292.0,
            curve_number: cn,
            rain_weight,
            retention_mm: s,
            initial_abstraction_mm: ia,
        }
    }

    #[test]
    fn test_cn90_point_under_200mm_is_high() {
        let registry = CatchmentRegistry::from_points(vec![point(0, 90.0, 1.0)]);
        let result = compute(&registry, 200.0);

        assert_eq!(result.len(), 1);
        // S = 28.22, Ia = 5.64: (194.36)^2 / 222.58 = 169.7
        let expected = (200.0 - 5.6444_f64).powi(2) / (200.0 - 5.6444 + 28.2222);
        assert!((result[0].runoff_mm - expected).abs() < 0.01);
        assert!(result[0].runoff_mm > 165.0 && result[0].runoff_mm < 175.0);
        assert_eq!(result[0].status, RunoffStatus::High);
    }

    #[test]
    fn test_runoff_is_zero_up_to_initial_abstraction() {
        let (s, ia) = scs_constants(70.0);
        assert_eq!(runoff_depth(0.0, s, ia), 0.0);
        assert_eq!(runoff_depth(ia, s, ia), 0.0);
        assert!(runoff_depth(ia + 1e-6, s, ia) > 0.0);
        assert!(runoff_depth(ia + 1e-6, s, ia) < 1e-9, "runoff must be continuous at Ia");
    }

    #[test]
    fn test_runoff_is_monotonic_in_rainfall() {
        for cn in [40.0, 65.0, 80.0, 90.0, 98.0] {
            for weight in [0.0, 0.5, 1.0, 1.2] {
                let p = point(0, cn, weight);
                let mut previous = 0.0;
                for step in 0..400 {
                    let rain = step as f64 * 0.75;
                    let q = point_runoff(&p, rain);
                    assert!(q >= previous, "runoff decreased at cn={} w={} rain={}", cn, weight, rain);
                    previous = q;
                }
            }
        }
    }

    #[test]
    fn test_status_thresholds_are_strict() {
        assert_eq!(classify_runoff(35.0), RunoffStatus::Elevated);
        assert_eq!(classify_runoff(35.01), RunoffStatus::High);
        assert_eq!(classify_runoff(15.0), RunoffStatus::Normal);
        assert_eq!(classify_runoff(15.01), RunoffStatus::Elevated);
    }

    #[test]
    fn test_points_at_or_below_activity_threshold_are_dropped() {
        let registry = CatchmentRegistry::from_points(vec![point(0, 70.0, 1.0), point(1, 95.0, 1.0)]);
        // CN 70: Ia = 21.8 mm, so 25 mm yields well under 5 mm of runoff.
        let result = compute(&registry, 25.0);
        assert_eq!(result.len(), 1);
        assert!(result.iter().all(|p| p.runoff_mm > ACTIVE_RUNOFF_MM));
    }

    #[test]
    fn test_empty_registry_yields_empty_result() {
        let registry = CatchmentRegistry::empty();
        assert!(compute(&registry, 500.0).is_empty());
    }

    #[test]
    fn test_zero_weight_point_never_runs_off() {
        let registry = CatchmentRegistry::from_points(vec![point(0, 98.0, 0.0)]);
        assert!(compute(&registry, 1000.0).is_empty());
    }

    #[test]
    fn test_sampling_returns_exactly_the_cap() {
        let points: Vec<_> = (0..5000).map(|i| point(i, 90.0, 1.0)).collect();
        let registry = CatchmentRegistry::from_points(points);
        let mut rng = StdRng::seed_from_u64(7);

        let result = compute_capped(&registry, 200.0, 2500, &mut rng);
        assert_eq!(result.len(), 2500);
        assert!(result.iter().all(|p| p.runoff_mm > ACTIVE_RUNOFF_MM));
    }

    #[test]
    fn test_sampling_below_cap_is_identity() {
        let registry = CatchmentRegistry::from_points((0..10).map(|i| point(i, 90.0, 1.0)).collect());
        let mut rng = StdRng::seed_from_u64(1);
        let full = compute(&registry, 200.0);
        let capped = compute_capped(&registry, 200.0, 2500, &mut rng);
        assert_eq!(full, capped);
    }

    #[test]
    fn test_sampling_keeps_class_proportions() {
        // Half the points are high (CN 95, weight 1.0), half elevated (CN 80, weight 0.5).
        let mut points = Vec::new();
        for i in 0..4000 {
            if i % 2 == 0 {
                points.push(point(i, 95.0, 1.0));
            } else {
                points.push(point(i, 80.0, 0.5));
            }
        }
        let registry = CatchmentRegistry::from_points(points);
        let full = compute(&registry, 120.0);
        let high_share_full =
            full.iter().filter(|p| p.status == RunoffStatus::High).count() as f64 / full.len() as f64;

        let mut rng = StdRng::seed_from_u64(42);
        let sampled = sample_points(full, 1000, &mut rng);
        let high_share_sampled =
            sampled.iter().filter(|p| p.status == RunoffStatus::High).count() as f64 / sampled.len() as f64;

        assert!(
            (high_share_full - high_share_sampled).abs() < 0.08,
            "sampling shifted the high share from {:.3} to {:.3}",
            high_share_full,
            high_share_sampled
        );
    }
}
