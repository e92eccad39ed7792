/// Risk assessment and the text that goes with it.
///
/// Submodules:
/// - `thresholds` - deterministic discharge cutoffs (forecast and fallback).
/// - `classifier` - trained-model classification with threshold fallback.
/// - `advisory`   - return-period labels, advisory text, impact estimates.

pub mod advisory;
pub mod classifier;
pub mod thresholds;
