//! Filter-driven explorer aggregates.
//!
//! Unlike the canned questions, these pipelines take a [`FilterSelection`]
//! and aggregate whatever subset of the table it accepts. The option
//! listings (`state_options` and friends) feed the front end's pickers;
//! every list is distinct and sorted so widget order is stable.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::model::*;
use crate::questions::{AnalyticsResult, StateTurnoutChangeRow};
use crate::{mean_by, pct, sum_votes_by};

fn filtered<'a>(ds: &'a Dataset, sel: &'a FilterSelection) -> impl Iterator<Item = &'a Record> {
    ds.records().iter().filter(move |r| sel.accepts(r))
}

// **** Picker option listings ****

pub fn state_options(ds: &Dataset) -> Vec<String> {
    distinct(ds.records().iter().map(|r| r.state.clone()))
}

/// Constituencies of the given states; all constituencies when the state
/// list is empty.
pub fn constituency_options(ds: &Dataset, states: &[String]) -> Vec<String> {
    distinct(
        ds.records()
            .iter()
            .filter(|r| states.is_empty() || states.iter().any(|s| s == &r.state))
            .map(|r| r.constituency.clone()),
    )
}

pub fn party_options(ds: &Dataset) -> Vec<String> {
    distinct(ds.records().iter().map(|r| r.party.clone()))
}

fn distinct<I: Iterator<Item = String>>(values: I) -> Vec<String> {
    let set: BTreeSet<String> = values.collect();
    set.into_iter().collect()
}

// **** Aggregate views ****

#[derive(Debug, Clone, PartialEq)]
pub struct StateVotesRow {
    pub state: String,
    pub votes: u64,
}

/// Total votes per state within the selection, most first.
pub fn votes_by_state(ds: &Dataset, sel: &FilterSelection) -> AnalyticsResult<Vec<StateVotesRow>> {
    let by_state = sum_votes_by(filtered(ds, sel), |r| r.state.clone(), |r| r.total_votes);
    if by_state.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<StateVotesRow> = by_state
        .into_iter()
        .map(|(state, votes)| StateVotesRow { state, votes })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r.votes));
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartyVotesRow {
    pub party: String,
    pub votes: u64,
}

/// Total votes per party within the selection, most first.
pub fn party_totals(ds: &Dataset, sel: &FilterSelection) -> AnalyticsResult<Vec<PartyVotesRow>> {
    let by_party = sum_votes_by(filtered(ds, sel), |r| r.party.clone(), |r| r.total_votes);
    if by_party.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<PartyVotesRow> = by_party
        .into_iter()
        .map(|(party, votes)| PartyVotesRow { party, votes })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r.votes));
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartyTrendRow {
    pub party: String,
    pub year: u16,
    pub votes: u64,
}

/// Votes per (party, cycle) within the selection, ordered by party then
/// year so the two cycles of a party sit next to each other.
pub fn party_trend(ds: &Dataset, sel: &FilterSelection) -> AnalyticsResult<Vec<PartyTrendRow>> {
    let by_key = sum_votes_by(
        filtered(ds, sel),
        |r| (r.party.clone(), r.year),
        |r| r.total_votes,
    );
    if by_key.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    Ok(by_key
        .into_iter()
        .map(|((party, year), votes)| PartyTrendRow { party, year, votes })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatePartyRow {
    pub state: String,
    pub party: String,
    pub votes: u64,
}

/// Votes per (state, party) within the selection; states alphabetical,
/// parties within a state by descending votes.
pub fn state_party_breakdown(
    ds: &Dataset,
    sel: &FilterSelection,
) -> AnalyticsResult<Vec<StatePartyRow>> {
    let by_key = sum_votes_by(
        filtered(ds, sel),
        |r| (r.state.clone(), r.party.clone()),
        |r| r.total_votes,
    );
    if by_key.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<StatePartyRow> = by_key
        .into_iter()
        .map(|((state, party), votes)| StatePartyRow {
            state,
            party,
            votes,
        })
        .collect();
    rows.sort_by(|a, b| a.state.cmp(&b.state).then(b.votes.cmp(&a.votes)));
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateYearTurnoutRow {
    pub state: String,
    pub year: u16,
    pub avg_turnout_pct: f64,
}

/// Mean constituency turnout per (state, cycle) within the selection.
pub fn turnout_by_state(
    ds: &Dataset,
    sel: &FilterSelection,
) -> AnalyticsResult<Vec<StateYearTurnoutRow>> {
    let turnouts = selection_turnouts(ds, sel);
    if turnouts.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    Ok(mean_by(
        turnouts
            .into_iter()
            .map(|((state, year, _), t)| ((state, year), t)),
    )
    .into_iter()
    .map(|((state, year), avg_turnout_pct)| StateYearTurnoutRow {
        state,
        year,
        avg_turnout_pct,
    })
    .collect())
}

/// Turnout per (state, year, constituency) in the selection, with the
/// elector roll counted once per constituency.
fn selection_turnouts(
    ds: &Dataset,
    sel: &FilterSelection,
) -> BTreeMap<(String, u16, String), f64> {
    let mut acc: BTreeMap<(String, u16, String), (u64, u64)> = BTreeMap::new();
    for r in filtered(ds, sel) {
        let e = acc
            .entry((r.state.clone(), r.year, r.constituency.clone()))
            .or_insert((0, 0));
        e.0 += r.total_votes;
        e.1 = e.1.max(r.total_electors);
    }
    acc.into_iter()
        .map(|(key, (votes, electors))| (key, pct(votes as f64, electors as f64)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopCandidateRow {
    pub state: String,
    pub year: u16,
    pub constituency: String,
    pub candidate: String,
    pub party: String,
    pub votes: u64,
}

/// The `n` best-scoring candidate rows of each state in the selection.
pub fn top_candidates_by_state(
    ds: &Dataset,
    sel: &FilterSelection,
    n: usize,
) -> AnalyticsResult<Vec<TopCandidateRow>> {
    let mut by_state: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for r in filtered(ds, sel) {
        by_state.entry(r.state.clone()).or_default().push(r);
    }
    if by_state.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<TopCandidateRow> = Vec::new();
    for (state, mut records) in by_state {
        records.sort_by_key(|r| std::cmp::Reverse(r.total_votes));
        rows.extend(records.into_iter().take(n).map(|r| TopCandidateRow {
            state: state.clone(),
            year: r.year,
            constituency: r.constituency.clone(),
            candidate: r.candidate.clone(),
            party: r.party.clone(),
            votes: r.total_votes,
        }));
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnoutChangeSummary {
    /// One row per state present in both cycles, alphabetical.
    pub rows: Vec<StateTurnoutChangeRow>,
    pub top: StateTurnoutChangeRow,
    pub bottom: StateTurnoutChangeRow,
    pub average_change: f64,
}

/// Between-cycle turnout change of the states in the selection, with the
/// best and worst mover and the mean change over all paired states. The
/// selection's own year axis is ignored here since both cycles are needed.
pub fn turnout_change_summary(
    ds: &Dataset,
    sel: &FilterSelection,
) -> AnalyticsResult<TurnoutChangeSummary> {
    let both_years = FilterSelection {
        years: Vec::new(),
        ..sel.clone()
    };
    let (earlier, later) = ds.years();
    let by_state_year: BTreeMap<(String, u16), f64> = mean_by(
        selection_turnouts(ds, &both_years)
            .into_iter()
            .map(|((state, year, _), t)| ((state, year), t)),
    );

    let states: BTreeSet<&String> = by_state_year.keys().map(|(state, _)| state).collect();
    let rows: Vec<StateTurnoutChangeRow> = states
        .into_iter()
        .filter_map(|state| {
            let p0 = by_state_year.get(&(state.clone(), earlier))?;
            let p1 = by_state_year.get(&(state.clone(), later))?;
            Some(StateTurnoutChangeRow {
                state: state.clone(),
                earlier_pct: *p0,
                later_pct: *p1,
                change: p1 - p0,
            })
        })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    debug!("turnout_change_summary: {} states paired", rows.len());

    let top = rows
        .iter()
        .max_by(|a, b| a.change.total_cmp(&b.change))
        .cloned()
        .ok_or(AnalyticsError::NoMatchingRows)?;
    let bottom = rows
        .iter()
        .min_by(|a, b| a.change.total_cmp(&b.change))
        .cloned()
        .ok_or(AnalyticsError::NoMatchingRows)?;
    let average_change = rows.iter().map(|r| r.change).sum::<f64>() / rows.len() as f64;
    Ok(TurnoutChangeSummary {
        rows,
        top,
        bottom,
        average_change,
    })
}

// **** Joining dataset states onto map regions ****

/// The handful of states whose official result-file name differs from the
/// label commonly carried by Indian state boundary files.
const STATE_NAME_CORRECTIONS: [(&str, &str); 8] = [
    ("Odisha", "Orissa"),
    ("Uttarakhand", "Uttaranchal"),
    ("Telangana", "Telengana"),
    ("Delhi", "NCT of Delhi"),
    ("Puducherry", "Pondicherry"),
    (
        "Andaman and Nicobar Islands",
        "Andaman & Nicobar Islands",
    ),
    (
        "Dadra and Nagar Haveli and Daman and Diu",
        "Dadra & Nagar Haveli",
    ),
    ("Jammu and Kashmir", "Jammu & Kashmir"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct RegionJoin {
    /// (dataset state name, matching region label) pairs.
    pub matched: Vec<(String, String)>,
    /// Dataset states with no region label, in input order.
    pub unmatched: Vec<String>,
}

/// Joins dataset state names onto the region labels of a boundary file,
/// applying the known spelling corrections. Matching is case-insensitive;
/// states without a label land in `unmatched` so a map view can degrade
/// instead of silently dropping them.
pub fn match_states_to_regions(states: &[String], region_names: &[String]) -> RegionJoin {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for state in states {
        let wanted = STATE_NAME_CORRECTIONS
            .iter()
            .find(|(from, _)| from == state)
            .map(|(_, to)| *to)
            .unwrap_or(state.as_str());
        match region_names
            .iter()
            .find(|label| label.eq_ignore_ascii_case(wanted))
        {
            Some(label) => matched.push((state.clone(), label.clone())),
            None => unmatched.push(state.clone()),
        }
    }
    RegionJoin { matched, unmatched }
}
