//! Source concordance weight tables and per-call effective-weight derivation.
//!
//! Grounded on spec.md §4.3.1/§4.3.2. The weight table is the one piece of genuinely
//! tabular domain data in the engine, so it is kept as code rather than a config
//! file, keyed by an `EnumMap` the way the teacher keys its small fixed
//! per-genome-build lookups (`EnumMap<GenomeRelease, Databases>` in
//! `server/rest.rs`) rather than a `HashMap`.

use enum_map::{enum_map, EnumMap};

use crate::common::{CallableState, SourceType, VariantType};

/// `(SNP base weight, STR base weight)` per source type, per the table in spec.md
/// §4.3.1. `None` in the STR column is the spec's "n/a" (chip arrays do not call
/// short tandem repeats). Keyed with an `EnumMap` the way the teacher keys its own
/// small fixed per-genome-build/per-database lookups (e.g. `EnumMap<GenomeRelease,
/// Databases>` in `server/rest.rs`).
fn weight_table() -> EnumMap<SourceType, (f64, Option<f64>)> {
    enum_map! {
        SourceType::WgsLongRead => (0.90, Some(0.90)),
        SourceType::WgsShortRead => (0.85, Some(0.70)),
        SourceType::TargetedNgs => (0.80, Some(0.65)),
        SourceType::Chip => (0.55, None),
        SourceType::CapillaryElectrophoresis => (0.40, Some(1.00)),
    }
}

/// Base concordance weight for `source_type` in the context of `variant_type`.
///
/// Returns `None` for combinations the spec defines as "n/a" (chip genotyping
/// arrays do not call short tandem repeats).
pub fn base_weight(source_type: SourceType, variant_type: VariantType) -> Option<f64> {
    let (snp, str_) = weight_table()[source_type];
    if matches!(variant_type, VariantType::Str) {
        str_
    } else {
        Some(snp)
    }
}

/// Method tier (integer 1..=5) derived from a source's SNP-context base weight.
///
/// Per spec.md §9 open question 2: the tier is always *derived* from the weight,
/// never stored independently, so there is no way for the two to drift apart.
pub fn method_tier(snp_base_weight: f64) -> i32 {
    (snp_base_weight * 5.0).round() as i32
}

/// Multiplier applied for a call's callable-region state, per spec.md §4.3.2.
pub fn callable_factor(state: Option<CallableState>) -> f64 {
    match state {
        None | Some(CallableState::Callable) => 1.0,
        Some(CallableState::LowCoverage) | Some(CallableState::PoorMappingQuality) => 0.5,
        Some(CallableState::NoCoverage) | Some(CallableState::RefN) => 0.0,
    }
}

/// Multiplier applied for a call's depth/mapping-quality metrics, per spec.md §4.3.2.
pub fn quality_factor(read_depth: Option<i32>, mapping_quality: Option<i32>) -> f64 {
    match (read_depth, mapping_quality) {
        (Some(depth), Some(mq)) if depth >= 10 && mq >= 40 => 1.0,
        (Some(depth), _) if (5..=9).contains(&depth) => 0.75,
        (Some(depth), _) if (1..=4).contains(&depth) => 0.5,
        (Some(depth), Some(mq)) if depth >= 10 && mq < 40 => 1.0,
        (None, _) | (_, None) => 1.0,
        _ => 1.0,
    }
}

/// Effective concordance weight stored on a source call at insert time.
///
/// `effective = base_weight * callable_factor * quality_factor` (spec.md §4.3.2).
pub fn effective_weight(
    base_weight: f64,
    callable_state: Option<CallableState>,
    read_depth: Option<i32>,
    mapping_quality: Option<i32>,
) -> f64 {
    base_weight * callable_factor(callable_state) * quality_factor(read_depth, mapping_quality)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SourceType::WgsLongRead, VariantType::Snp, Some(0.90))]
    #[case(SourceType::WgsShortRead, VariantType::Snp, Some(0.85))]
    #[case(SourceType::WgsShortRead, VariantType::Str, Some(0.70))]
    #[case(SourceType::TargetedNgs, VariantType::Snp, Some(0.80))]
    #[case(SourceType::Chip, VariantType::Snp, Some(0.55))]
    #[case(SourceType::Chip, VariantType::Str, None)]
    #[case(SourceType::CapillaryElectrophoresis, VariantType::Snp, Some(0.40))]
    #[case(SourceType::CapillaryElectrophoresis, VariantType::Str, Some(1.00))]
    fn test_base_weight(
        #[case] source_type: SourceType,
        #[case] variant_type: VariantType,
        #[case] expected: Option<f64>,
    ) {
        assert_eq!(base_weight(source_type, variant_type), expected);
    }

    #[test]
    fn test_method_tier() {
        assert_eq!(method_tier(0.90), 5);
        assert_eq!(method_tier(0.85), 4);
        assert_eq!(method_tier(0.80), 4);
        assert_eq!(method_tier(0.55), 3);
        assert_eq!(method_tier(0.40), 2);
    }

    #[test]
    fn test_callable_factor() {
        assert_eq!(callable_factor(None), 1.0);
        assert_eq!(callable_factor(Some(CallableState::Callable)), 1.0);
        assert_eq!(callable_factor(Some(CallableState::LowCoverage)), 0.5);
        assert_eq!(
            callable_factor(Some(CallableState::PoorMappingQuality)),
            0.5
        );
        assert_eq!(callable_factor(Some(CallableState::NoCoverage)), 0.0);
        assert_eq!(callable_factor(Some(CallableState::RefN)), 0.0);
    }

    #[test]
    fn test_quality_factor() {
        assert_eq!(quality_factor(Some(12), Some(45)), 1.0);
        assert_eq!(quality_factor(Some(12), Some(30)), 1.0);
        assert_eq!(quality_factor(Some(7), Some(45)), 0.75);
        assert_eq!(quality_factor(Some(3), Some(45)), 0.5);
        assert_eq!(quality_factor(None, None), 1.0);
    }

    #[test]
    fn test_effective_weight_scenario_b() {
        // Scenario B (spec.md §8): WGS_SHORT and WGS_LONG at full quality, no
        // callable annotation recorded.
        assert!(float_cmp::approx_eq!(
            f64,
            effective_weight(0.85, None, None, None),
            0.85,
            ulps = 2
        ));
        assert!(float_cmp::approx_eq!(
            f64,
            effective_weight(0.90, None, None, None),
            0.90,
            ulps = 2
        ));
    }
}
