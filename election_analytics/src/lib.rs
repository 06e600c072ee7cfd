//! Aggregation and comparison pipelines over a fixed two-cycle election
//! results table.
//!
//! The crate is organized around one immutable [`Dataset`] (built once with
//! [`DatasetBuilder`]) and a family of pure derivation functions: the canned
//! analytical questions live in [`questions`], the filter-driven explorer
//! aggregates in [`explore`]. Every function re-derives its result from the
//! base table on each call, so identical inputs always produce identical
//! output ordering and values.

mod builder;
pub mod explore;
mod model;
pub mod questions;
pub mod quick_start;

use std::collections::BTreeMap;

pub use crate::builder::{DatasetBuilder, RawRecord};
pub use crate::model::*;

// **** Shared pipeline primitives ****

/// numerator / denominator * 100, with a zero denominator yielding 0 so
/// that downstream sorts stay stable (never NaN).
pub(crate) fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// Canonical form used when comparing party names across cycles:
/// whitespace-trimmed, ASCII-uppercased. Centralized so that an alias
/// table could later slot in here.
pub(crate) fn normalized_party(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Groups records by a key and sums a vote field per group.
pub(crate) fn sum_votes_by<'a, K, I, KF, VF>(records: I, key: KF, value: VF) -> BTreeMap<K, u64>
where
    K: Ord,
    I: Iterator<Item = &'a Record>,
    KF: Fn(&Record) -> K,
    VF: Fn(&Record) -> u64,
{
    let mut acc: BTreeMap<K, u64> = BTreeMap::new();
    for r in records {
        *acc.entry(key(r)).or_insert(0) += value(r);
    }
    acc
}

/// Means of already-keyed float samples.
pub(crate) fn mean_by<K, I>(pairs: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: Iterator<Item = (K, f64)>,
{
    let mut acc: BTreeMap<K, (f64, u64)> = BTreeMap::new();
    for (k, v) in pairs {
        let e = acc.entry(k).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, count))| (k, if count == 0 { 0.0 } else { sum / count as f64 }))
        .collect()
}

/// The leading candidate of a constituency in one cycle, plus the
/// runner-up's metric when there is more than one candidate.
#[derive(Debug, Clone)]
pub(crate) struct ConstituencyLeader<'a> {
    pub record: &'a Record,
    pub metric: u64,
    pub runner_up: Option<u64>,
}

/// Winner extraction: one leader per constituency, by a caller-chosen
/// metric. Records for which the metric is absent are skipped.
///
/// Ties on the metric are broken lexicographically by candidate name, so
/// the result is deterministic under reordering of the source file.
pub(crate) fn leaders_by<'a, F>(
    ds: &'a Dataset,
    year: u16,
    metric: F,
) -> BTreeMap<&'a str, ConstituencyLeader<'a>>
where
    F: Fn(&Record) -> Option<u64>,
{
    let mut acc: BTreeMap<&'a str, ConstituencyLeader<'a>> = BTreeMap::new();
    for r in ds.cycle(year) {
        let v = match metric(r) {
            Some(v) => v,
            None => continue,
        };
        match acc.get_mut(r.constituency.as_str()) {
            None => {
                acc.insert(
                    r.constituency.as_str(),
                    ConstituencyLeader {
                        record: r,
                        metric: v,
                        runner_up: None,
                    },
                );
            }
            Some(leader) => {
                if v > leader.metric || (v == leader.metric && r.candidate < leader.record.candidate)
                {
                    let displaced = leader.metric;
                    leader.record = r;
                    leader.metric = v;
                    leader.runner_up =
                        Some(leader.runner_up.map_or(displaced, |s| s.max(displaced)));
                } else {
                    leader.runner_up = Some(leader.runner_up.map_or(v, |s| s.max(v)));
                }
            }
        }
    }
    acc
}

/// Winner extraction on the standard vote column.
pub(crate) fn winners(ds: &Dataset, year: u16) -> BTreeMap<&str, ConstituencyLeader<'_>> {
    leaders_by(ds, year, |r| Some(r.total_votes))
}

/// Per-constituency poll totals for one cycle: candidate votes summed,
/// the elector roll counted once (it is repeated on every candidate row).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PollTotals {
    pub state: String,
    pub votes: u64,
    pub electors: u64,
}

impl PollTotals {
    pub fn turnout_pct(&self) -> f64 {
        pct(self.votes as f64, self.electors as f64)
    }
}

pub(crate) fn constituency_totals(ds: &Dataset, year: u16) -> BTreeMap<String, PollTotals> {
    let mut acc: BTreeMap<String, PollTotals> = BTreeMap::new();
    for r in ds.cycle(year) {
        let e = acc.entry(r.constituency.clone()).or_insert(PollTotals {
            state: r.state.clone(),
            votes: 0,
            electors: 0,
        });
        e.votes += r.total_votes;
        e.electors = e.electors.max(r.total_electors);
    }
    acc
}

/// Linear-interpolation quantile over an ascending-sorted slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Fixed age buckets, left-closed: [18,25), [25,35), ... [65,100).
pub(crate) const AGE_GROUPS: [(&str, u32, u32); 6] = [
    ("18-24", 18, 25),
    ("25-34", 25, 35),
    ("35-44", 35, 45),
    ("45-54", 45, 55),
    ("55-64", 55, 65),
    ("65+", 65, 100),
];

pub(crate) fn age_group(age: u32) -> Option<&'static str> {
    AGE_GROUPS
        .iter()
        .find(|(_, lo, hi)| age >= *lo && age < *hi)
        .map(|(label, _, _)| *label)
}

#[cfg(test)]
pub(crate) mod test_data {
    use crate::{DatasetBuilder, Dataset, RawRecord};

    pub fn rec(
        constituency: &str,
        state: &str,
        year: u16,
        party: &str,
        candidate: &str,
        votes: u64,
        electors: u64,
    ) -> RawRecord {
        RawRecord {
            constituency: constituency.to_string(),
            state: state.to_string(),
            year,
            party: party.to_string(),
            candidate: candidate.to_string(),
            total_votes: votes,
            total_electors: electors,
            ..RawRecord::default()
        }
    }

    pub fn dataset(raws: Vec<RawRecord>) -> Dataset {
        let mut b = DatasetBuilder::new();
        for r in raws {
            b.add_record(r);
        }
        b.build().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_data::*;
    use super::*;

    #[test]
    fn pct_handles_zero_denominator() {
        assert_eq!(pct(5.0, 0.0), 0.0);
        assert_eq!(pct(60.0, 120.0), 50.0);
    }

    #[test]
    fn party_normalization_trims_and_uppercases() {
        assert_eq!(normalized_party("  bjp "), "BJP");
        assert_eq!(normalized_party("Inc"), "INC");
    }

    #[test]
    fn leader_has_max_votes_over_all_rows_of_the_key() {
        let ds = dataset(vec![
            rec("X", "S", 2014, "A", "a1", 60_000, 100_000),
            rec("X", "S", 2014, "B", "b1", 40_000, 100_000),
            rec("Y", "S", 2014, "C", "c1", 10_000, 50_000),
            rec("X", "S", 2019, "B", "b1", 55_000, 100_000),
        ]);
        let w = winners(&ds, 2014);
        assert_eq!(w.len(), 2);
        let x = &w["X"];
        assert_eq!(x.record.party, "A");
        assert_eq!(x.metric, 60_000);
        assert_eq!(x.runner_up, Some(40_000));
        for r in ds.cycle(2014) {
            if r.constituency == "X" {
                assert!(w["X"].metric >= r.total_votes);
            }
        }
        // Single-candidate constituency has no runner-up.
        assert_eq!(w["Y"].runner_up, None);
    }

    #[test]
    fn leader_tie_breaks_on_candidate_name() {
        let ds = dataset(vec![
            rec("X", "S", 2014, "B", "zeta", 40_000, 100_000),
            rec("X", "S", 2014, "A", "alpha", 40_000, 100_000),
            rec("X", "S", 2019, "A", "alpha", 40_000, 100_000),
        ]);
        let w = winners(&ds, 2014);
        assert_eq!(w["X"].record.candidate, "alpha");
        assert_eq!(w["X"].runner_up, Some(40_000));
    }

    #[test]
    fn constituency_totals_count_the_roll_once() {
        let ds = dataset(vec![
            rec("X", "S", 2014, "A", "a1", 60_000, 100_000),
            rec("X", "S", 2014, "B", "b1", 40_000, 100_000),
            rec("X", "S", 2019, "A", "a1", 1, 1),
        ]);
        let totals = constituency_totals(&ds, 2014);
        let x = &totals["X"];
        assert_eq!(x.votes, 100_000);
        assert_eq!(x.electors, 100_000);
        assert_eq!(x.turnout_pct(), 100.0);
    }

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 5.0);
        assert_eq!(quantile(&v, 0.5), 3.0);
        assert!((quantile(&v, 0.9) - 4.6).abs() < 1e-9);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn age_groups_are_left_closed() {
        assert_eq!(age_group(18), Some("18-24"));
        assert_eq!(age_group(24), Some("18-24"));
        assert_eq!(age_group(25), Some("25-34"));
        assert_eq!(age_group(65), Some("65+"));
        assert_eq!(age_group(17), None);
        assert_eq!(age_group(100), None);
    }
}
