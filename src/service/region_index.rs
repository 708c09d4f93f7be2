//! Per-profile callable-region interval index (spec.md §4.5).
//!
//! The merge/query algorithm is pure over `&[Region]` so it can be built and tested
//! without a database (spec.md §8, testable property 7 / scenario G); the thin
//! repository-backed wrappers at the bottom of this module are what
//! [`crate::service::query`] calls in production.

use std::collections::HashMap;

use diesel::pg::PgConnection;
use indexmap::IndexMap;
use itertools::Itertools;
use uuid::Uuid;

use crate::common::CallableState;
use crate::err::{EngineError, EngineResult};
use crate::model::{Profile, Region};
use crate::repo;

/// Default contig for a profile whose regions don't specify one explicitly: this
/// engine only ever profiles the Y chromosome (spec.md §1), so `queryCallableState`
/// in spec.md §6 takes no contig argument — it is always `"Y"`.
pub const DEFAULT_CONTIG: &str = "Y";

fn precedence_rank(state: CallableState) -> u8 {
    // CALLABLE > LOW_COVERAGE > POOR_MAPPING_QUALITY > NO_COVERAGE > REF_N (spec.md §4.5).
    match state {
        CallableState::Callable => 0,
        CallableState::LowCoverage => 1,
        CallableState::PoorMappingQuality => 2,
        CallableState::NoCoverage => 3,
        CallableState::RefN => 4,
    }
}

fn best_state(states: &[CallableState]) -> CallableState {
    *states
        .iter()
        .min_by_key(|s| precedence_rank(**s))
        .expect("best_state called with no states")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct MergedInterval {
    pub start: i64,
    pub end: i64, // inclusive
    pub state: CallableState,
}

impl MergedInterval {
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

/// Non-overlapping, precedence-merged intervals per contig for one profile.
///
/// Backed by an `IndexMap` rather than a `HashMap` so iteration order (`by_contig`'s
/// insertion order) is deterministic across runs — relevant once this engine profiles
/// assemblies with pseudo-autosomal regions touching more than one contig.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    by_contig: IndexMap<String, Vec<MergedInterval>>,
}

impl IntervalIndex {
    /// Merges all per-source regions, contig by contig, with the precedence order
    /// CALLABLE > LOW_COVERAGE > POOR_MAPPING_QUALITY > NO_COVERAGE > REF_N.
    pub fn build(regions: &[Region]) -> Self {
        let mut by_contig: IndexMap<String, Vec<&Region>> = IndexMap::new();
        for r in regions {
            by_contig.entry(r.contig.clone()).or_default().push(r);
        }

        let mut merged_by_contig = IndexMap::new();
        for (contig, regions) in by_contig {
            merged_by_contig.insert(contig, merge_one_contig(&regions));
        }

        IntervalIndex {
            by_contig: merged_by_contig,
        }
    }

    /// O(log n) point lookup via binary search for the rightmost interval whose
    /// start <= position; `NO_COVERAGE` if `position` falls outside every interval
    /// (spec.md §4.5).
    pub fn query_point(&self, contig: &str, position: i64) -> CallableState {
        let Some(intervals) = self.by_contig.get(contig) else {
            return CallableState::NoCoverage;
        };
        match intervals.binary_search_by(|iv| {
            if position < iv.start {
                std::cmp::Ordering::Greater
            } else if position > iv.end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        }) {
            Ok(idx) => intervals[idx].state,
            Err(_) => CallableState::NoCoverage,
        }
    }

    /// Sorts `positions` and sweeps the interval list once, O(n + m).
    pub fn query_batch(&self, contig: &str, positions: &[i64]) -> Vec<(i64, CallableState)> {
        let Some(intervals) = self.by_contig.get(contig) else {
            return positions.iter().map(|&p| (p, CallableState::NoCoverage)).collect();
        };

        let mut order: Vec<usize> = (0..positions.len()).collect();
        order.sort_by_key(|&i| positions[i]);

        let mut result = vec![(0i64, CallableState::NoCoverage); positions.len()];
        let mut cursor = 0usize;
        for idx in order {
            let pos = positions[idx];
            while cursor < intervals.len() && intervals[cursor].end < pos {
                cursor += 1;
            }
            let state = if cursor < intervals.len() && intervals[cursor].start <= pos {
                intervals[cursor].state
            } else {
                CallableState::NoCoverage
            };
            result[idx] = (pos, state);
        }
        result
    }

    pub fn intervals_for(&self, contig: &str) -> &[MergedInterval] {
        self.by_contig
            .get(contig)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_callable_bases(&self) -> i64 {
        self.by_contig
            .values()
            .flatten()
            .filter(|iv| iv.state == CallableState::Callable)
            .map(MergedInterval::len)
            .sum()
    }
}

fn merge_one_contig(regions: &[&Region]) -> Vec<MergedInterval> {
    if regions.is_empty() {
        return Vec::new();
    }

    let breakpoints: Vec<i64> = regions
        .iter()
        .flat_map(|r| [r.start_position, r.end_position + 1])
        .sorted_unstable()
        .dedup()
        .collect();

    let mut raw_intervals: Vec<MergedInterval> = Vec::new();
    for w in breakpoints.windows(2) {
        let (seg_start, seg_end_excl) = (w[0], w[1]);
        let covering: Vec<CallableState> = regions
            .iter()
            .filter(|r| r.start_position <= seg_start && r.end_position + 1 >= seg_end_excl)
            .map(|r| r.callable_state)
            .collect();
        if covering.is_empty() {
            continue;
        }
        raw_intervals.push(MergedInterval::new(seg_start, seg_end_excl - 1, best_state(&covering)));
    }

    // Coalesce adjacent segments that ended up with the same winning state.
    let mut merged: Vec<MergedInterval> = Vec::with_capacity(raw_intervals.len());
    for iv in raw_intervals {
        match merged.last_mut() {
            Some(last) if last.state == iv.state && last.end + 1 == iv.start => {
                last.end = iv.end;
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// One interval accepted by `importCallableIntervals(profileId, sourceId, intervals)`
/// (spec.md §4.5/§6).
#[derive(Debug, Clone)]
pub struct CallableInterval {
    pub contig: String,
    pub start_position: i64,
    pub end_position: i64,
    pub callable_state: CallableState,
    pub mean_coverage: Option<f64>,
    pub mean_mapping_quality: Option<f64>,
}

/// Inserts one `YProfileRegion` row per `intervals` entry for `(profile_id,
/// source_id)`. An interval with `end_position < start_position` is rejected as a
/// `ValidationFailure` rather than silently stored inverted.
pub fn import_callable_intervals(
    conn: &mut PgConnection,
    profile_id: Uuid,
    source_id: Uuid,
    intervals: Vec<CallableInterval>,
) -> EngineResult<Vec<Region>> {
    intervals
        .into_iter()
        .map(|iv| {
            if iv.end_position < iv.start_position {
                return Err(EngineError::validation(
                    "end_position",
                    format!("interval end {} precedes start {}", iv.end_position, iv.start_position),
                ));
            }
            repo::region::insert(
                conn,
                repo::region::NewRegion {
                    profile_id,
                    source_id,
                    contig: iv.contig,
                    start_position: iv.start_position,
                    end_position: iv.end_position,
                    callable_state: iv.callable_state,
                    mean_coverage: iv.mean_coverage,
                    mean_mapping_quality: iv.mean_mapping_quality,
                },
            )
        })
        .collect()
}

/// Loads a profile's regions and builds its interval index (spec.md §4.5/§5: "the
/// service may cache it per profile keyed by profile version" — caching is left to
/// the caller; this function always rebuilds from the current transaction's view).
pub fn build_index_for_profile(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> EngineResult<IntervalIndex> {
    let regions = repo::region::find_by_profile(conn, profile_id)?;
    Ok(IntervalIndex::build(&regions))
}

pub fn query_callable_state(
    conn: &mut PgConnection,
    profile_id: Uuid,
    position: i64,
    contig: Option<&str>,
) -> EngineResult<CallableState> {
    let index = build_index_for_profile(conn, profile_id)?;
    Ok(index.query_point(contig.unwrap_or(DEFAULT_CONTIG), position))
}

pub fn query_callable_states(
    conn: &mut PgConnection,
    profile_id: Uuid,
    positions: &[i64],
    contig: Option<&str>,
) -> EngineResult<Vec<(i64, CallableState)>> {
    let index = build_index_for_profile(conn, profile_id)?;
    Ok(index.query_batch(contig.unwrap_or(DEFAULT_CONTIG), positions))
}

/// Per-source region summary: region count, counts per state, total callable bases,
/// and total bases covered by any interval (spec.md §4.5).
#[derive(Debug, Clone, Default)]
pub struct CallableSummary {
    pub region_count: usize,
    pub counts_by_state: HashMap<CallableState, usize>,
    pub total_callable_bases: i64,
    pub total_bases: i64,
}

pub fn get_callable_summary(
    conn: &mut PgConnection,
    source_id: Uuid,
) -> EngineResult<CallableSummary> {
    let regions = repo::region::find_by_source(conn, source_id)?;
    let mut summary = CallableSummary {
        region_count: regions.len(),
        ..Default::default()
    };
    for r in &regions {
        *summary.counts_by_state.entry(r.callable_state).or_insert(0) += 1;
        let len = r.end_position - r.start_position + 1;
        summary.total_bases += len;
        if r.callable_state == CallableState::Callable {
            summary.total_callable_bases += len;
        }
    }
    Ok(summary)
}

/// Recomputes `callable_region_pct` as `callableBases / referenceSize` (spec.md
/// §4.5). `reference_size`, when absent, defaults to the sum of per-source interval
/// extents (i.e. unmerged, possibly-overlapping raw region lengths).
pub fn update_profile_callable_pct(
    conn: &mut PgConnection,
    profile_id: Uuid,
    reference_size: Option<i64>,
) -> EngineResult<Profile> {
    let regions = repo::region::find_by_profile(conn, profile_id)?;
    let index = IntervalIndex::build(&regions);
    let callable_bases = index.total_callable_bases();
    let ref_size = reference_size.unwrap_or_else(|| {
        regions
            .iter()
            .map(|r| r.end_position - r.start_position + 1)
            .sum()
    });

    let mut profile = repo::profile::find_by_id(conn, profile_id)?
        .ok_or_else(|| EngineError::NotFound(format!("profile {profile_id}")))?;
    profile.callable_region_pct = if ref_size > 0 {
        Some(callable_bases as f64 / ref_size as f64)
    } else {
        Some(0.0)
    };
    repo::profile::update(conn, &profile)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    fn region(contig: &str, start: i64, end: i64, state: CallableState) -> Region {
        Region {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            contig: contig.to_string(),
            start_position: start,
            end_position: end,
            callable_state: state,
            mean_coverage: None,
            mean_mapping_quality: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_g_callable_query() {
        let regions = vec![
            region("Y", 1_000_000, 5_000_000, CallableState::Callable),
            region("Y", 5_000_001, 6_000_000, CallableState::LowCoverage),
            region("Y", 6_000_001, 10_000_000, CallableState::Callable),
        ];
        let index = IntervalIndex::build(&regions);
        assert_eq!(index.query_point("Y", 3_000_000), CallableState::Callable);
        assert_eq!(index.query_point("Y", 5_500_000), CallableState::LowCoverage);
        assert_eq!(index.query_point("Y", 7_000_000), CallableState::Callable);
        assert_eq!(index.query_point("Y", 500), CallableState::NoCoverage);
    }

    #[test]
    fn batch_matches_point_queries() {
        let regions = vec![
            region("Y", 1, 100, CallableState::Callable),
            region("Y", 200, 300, CallableState::NoCoverage),
        ];
        let index = IntervalIndex::build(&regions);
        let positions = vec![50, 150, 250, 9999];
        let batch = index.query_batch("Y", &positions);
        for (pos, state) in batch {
            assert_eq!(state, index.query_point("Y", pos));
        }
    }

    #[test]
    fn precedence_prefers_callable_on_overlap() {
        let regions = vec![
            region("Y", 1, 1000, CallableState::NoCoverage),
            region("Y", 400, 600, CallableState::Callable),
        ];
        let index = IntervalIndex::build(&regions);
        assert_eq!(index.query_point("Y", 500), CallableState::Callable);
        assert_eq!(index.query_point("Y", 100), CallableState::NoCoverage);
        assert_eq!(index.query_point("Y", 900), CallableState::NoCoverage);
    }

    #[test]
    fn adjacent_same_state_intervals_coalesce() {
        let regions = vec![
            region("Y", 1, 100, CallableState::Callable),
            region("Y", 101, 200, CallableState::Callable),
        ];
        let index = IntervalIndex::build(&regions);
        assert_eq!(index.intervals_for("Y").len(), 1);
        assert_eq!(index.intervals_for("Y")[0].end, 200);
    }
}
