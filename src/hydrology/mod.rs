/// Rainfall-runoff hydrology for the basin.
///
/// Submodules:
/// - `runoff`    - SCS curve-number runoff and the distributed per-point calculator.
/// - `discharge` - basin-wide discharge from season, rain, antecedent rain and releases.
/// - `stage`     - rating-curve water surface and channel classification at a point.

pub mod discharge;
pub mod runoff;
pub mod stage;
