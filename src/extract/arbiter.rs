//! Quality arbitration between the text-layer and OCR results.
//!
//! The text layer is cheaper and more faithful to the original formatting
//! when it is present and substantial; OCR is noisier and only preferred
//! when it clearly recovers more content (typically scanned pages with no
//! embedded text). OCR wins when its output is at least `gain_percent`
//! longer than the text layer AND longer than `floor_chars` (so a near-empty
//! text layer is only displaced by an OCR result of some substance).
//!
//! The 20% / 100-char defaults are empirical and have not been calibrated
//! against a labeled corpus; they are configuration fields for that reason.

/// Thresholds for preferring OCR output over the text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterPolicy {
    /// Required OCR length gain over the text layer, in percent.
    pub gain_percent: u32,
    /// Minimum OCR length in characters for OCR to win at all.
    pub floor_chars: usize,
}

impl Default for ArbiterPolicy {
    fn default() -> Self {
        Self {
            gain_percent: 20,
            floor_chars: 100,
        }
    }
}

/// Decide whether the OCR result should replace the text-layer result.
///
/// Rule: OCR wins iff `len(ocr) > max(len(primary) * (1 + gain), floor)`,
/// strictly. Lengths are Unicode scalar counts. The comparison is done in
/// scaled integers so boundary cases are exact regardless of the configured
/// gain.
pub(crate) fn prefer_ocr(primary: &str, ocr: &str, policy: &ArbiterPolicy) -> bool {
    let primary_len = primary.chars().count() as u64;
    let ocr_len = ocr.chars().count() as u64;

    let threshold =
        (primary_len * (100 + policy.gain_percent as u64)).max(policy.floor_chars as u64 * 100);
    ocr_len * 100 > threshold
}
