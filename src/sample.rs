// sample.rs — missing-value boundary between host input and device buffers.
//
// The R binding layer encodes NA as NaN before the values reach this
// crate, so "missing" at this boundary means: any NaN. Everything that
// survives staging is a finite-or-infinite real f32 the kernel can
// index into.
//
// The all-missing case matters: a zero-length storage buffer is not a
// thing we can bind, so the session must decide *before* touching the
// device whether there is anything to upload. `stage` is that decision
// point — a pure function, tested without any GPU.

/// Sentinel for a missing observation. Comparisons against it are
/// useless (NaN != NaN); use `f32::is_nan` on the way in and write the
/// sentinel verbatim on the way out.
pub const MISSING: f32 = f32::NAN;

/// Result of staging one input vector.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedInput {
    /// Every observation was missing — the caller must short-circuit and
    /// return a sentinel-filled output without any device dispatch.
    AllMissing,
    /// The surviving observations, in input order. Never empty.
    Values(Vec<f32>),
}

/// Filter missing values out of `values`, preserving order.
pub fn stage(values: &[f32]) -> StagedInput {
    let kept: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if kept.is_empty() {
        StagedInput::AllMissing
    } else {
        StagedInput::Values(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_values_in_order() {
        let staged = stage(&[1.0, 2.0, 3.0]);
        assert_eq!(staged, StagedInput::Values(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn drops_missing_values() {
        let staged = stage(&[1.0, MISSING, 3.0, MISSING]);
        assert_eq!(staged, StagedInput::Values(vec![1.0, 3.0]));
    }

    #[test]
    fn all_missing_short_circuits() {
        assert_eq!(stage(&[MISSING; 5]), StagedInput::AllMissing);
    }

    #[test]
    fn empty_input_is_all_missing() {
        // No observations at all behaves like all-missing: nothing can
        // be uploaded, so the session must take the sentinel path.
        assert_eq!(stage(&[]), StagedInput::AllMissing);
    }

    #[test]
    fn infinities_are_not_missing() {
        let staged = stage(&[f32::INFINITY, MISSING]);
        assert_eq!(staged, StagedInput::Values(vec![f32::INFINITY]));
    }
}
