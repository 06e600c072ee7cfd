//! The canned analytical questions of the dashboard menu.
//!
//! Each function is a pure derivation over the immutable [`Dataset`]: group
//! by one or more keys, reduce, optionally pair the two cycles on a shared
//! key, compute a delta or ratio, rank and truncate. Percentages keep full
//! precision here; rounding is the presentation layer's concern.
//!
//! Naming convention for paired results: `earlier_*` is the first cycle of
//! [`Dataset::years`], `later_*` the second.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::model::*;
use crate::{
    age_group, constituency_totals, leaders_by, mean_by, normalized_party, pct, quantile,
    sum_votes_by, winners,
};

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

// **** 1. Constituency turnout extremes ****

#[derive(Debug, Clone, PartialEq)]
pub struct ConstituencyTurnoutRow {
    pub constituency: String,
    pub state: String,
    pub turnout_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnoutExtremes {
    pub top: Vec<ConstituencyTurnoutRow>,
    pub bottom: Vec<ConstituencyTurnoutRow>,
}

/// Top and bottom constituencies of one cycle by turnout.
pub fn constituency_turnout_extremes(
    ds: &Dataset,
    year: u16,
    n: usize,
) -> AnalyticsResult<TurnoutExtremes> {
    ds.check_year(year)?;
    let mut rows: Vec<ConstituencyTurnoutRow> = constituency_totals(ds, year)
        .into_iter()
        .map(|(constituency, t)| ConstituencyTurnoutRow {
            constituency,
            state: t.state.clone(),
            turnout_pct: t.turnout_pct(),
        })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| b.turnout_pct.total_cmp(&a.turnout_pct));
    let top: Vec<_> = rows.iter().take(n).cloned().collect();
    rows.reverse();
    let bottom: Vec<_> = rows.into_iter().take(n).collect();
    Ok(TurnoutExtremes { top, bottom })
}

// **** 2. State turnout extremes ****

#[derive(Debug, Clone, PartialEq)]
pub struct StateTurnoutRow {
    pub state: String,
    pub avg_turnout_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateTurnoutExtremes {
    pub top: Vec<StateTurnoutRow>,
    pub bottom: Vec<StateTurnoutRow>,
}

/// Top and bottom states of one cycle by mean constituency turnout.
pub fn state_turnout_extremes(
    ds: &Dataset,
    year: u16,
    n: usize,
) -> AnalyticsResult<StateTurnoutExtremes> {
    ds.check_year(year)?;
    let mut rows: Vec<StateTurnoutRow> = state_mean_turnout(ds, year)
        .into_iter()
        .map(|(state, avg_turnout_pct)| StateTurnoutRow {
            state,
            avg_turnout_pct,
        })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| b.avg_turnout_pct.total_cmp(&a.avg_turnout_pct));
    let top: Vec<_> = rows.iter().take(n).cloned().collect();
    rows.reverse();
    let bottom: Vec<_> = rows.into_iter().take(n).collect();
    Ok(StateTurnoutExtremes { top, bottom })
}

fn state_mean_turnout(ds: &Dataset, year: u16) -> BTreeMap<String, f64> {
    mean_by(
        constituency_totals(ds, year)
            .into_iter()
            .map(|(_, t)| (t.state.clone(), t.turnout_pct())),
    )
}

// **** 3. Same party in both cycles ****

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatWinnerRow {
    pub constituency: String,
    pub party: String,
    /// The winning party's later-cycle votes as % of the elector roll.
    pub vote_pct: f64,
}

/// Constituencies that elected the same party in both cycles, ranked by the
/// winner's later-cycle vote percentage.
pub fn repeat_winner_strongholds(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<RepeatWinnerRow>> {
    let (earlier, later) = ds.years();
    let w_earlier = winners(ds, earlier);
    let w_later = winners(ds, later);

    let mut rows: Vec<RepeatWinnerRow> = Vec::new();
    for (constituency, w1) in w_later.iter() {
        if let Some(w0) = w_earlier.get(constituency) {
            if normalized_party(&w0.record.party) == normalized_party(&w1.record.party) {
                rows.push(RepeatWinnerRow {
                    constituency: constituency.to_string(),
                    party: w1.record.party.clone(),
                    vote_pct: pct(w1.metric as f64, w1.record.total_electors as f64),
                });
            }
        }
    }
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| b.vote_pct.total_cmp(&a.vote_pct));
    rows.truncate(n);
    Ok(rows)
}

// **** 4. Different party in the two cycles ****

#[derive(Debug, Clone, PartialEq)]
pub struct FlippedSeatRow {
    pub constituency: String,
    pub earlier_party: String,
    pub later_party: String,
    pub earlier_vote_pct: f64,
    pub later_vote_pct: f64,
    /// Absolute difference of the winners' vote percentages.
    pub vote_pct_diff: f64,
}

/// Constituencies whose winning party changed, ranked by the absolute
/// difference between the two winners' vote percentages.
pub fn flipped_seats(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<FlippedSeatRow>> {
    let (earlier, later) = ds.years();
    let w_earlier = winners(ds, earlier);
    let w_later = winners(ds, later);

    let mut rows: Vec<FlippedSeatRow> = Vec::new();
    for (constituency, w1) in w_later.iter() {
        if let Some(w0) = w_earlier.get(constituency) {
            if normalized_party(&w0.record.party) != normalized_party(&w1.record.party) {
                let p0 = pct(w0.metric as f64, w0.record.total_electors as f64);
                let p1 = pct(w1.metric as f64, w1.record.total_electors as f64);
                rows.push(FlippedSeatRow {
                    constituency: constituency.to_string(),
                    earlier_party: w0.record.party.clone(),
                    later_party: w1.record.party.clone(),
                    earlier_vote_pct: p0,
                    later_vote_pct: p1,
                    vote_pct_diff: (p1 - p0).abs(),
                });
            }
        }
    }
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| b.vote_pct_diff.total_cmp(&a.vote_pct_diff));
    rows.truncate(n);
    Ok(rows)
}

// **** 5. Winning margin shifts ****

#[derive(Debug, Clone, PartialEq)]
pub struct MarginShiftRow {
    pub constituency: String,
    pub earlier_margin: u64,
    pub later_margin: u64,
    pub margin_diff: i64,
}

/// Constituencies ranked by the change of the winning margin between the
/// two cycles. A single-candidate contest has a margin equal to that
/// candidate's votes.
pub fn winning_margin_shifts(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<MarginShiftRow>> {
    let (earlier, later) = ds.years();
    let m_earlier = margins(ds, earlier);
    let m_later = margins(ds, later);

    let mut rows: Vec<MarginShiftRow> = Vec::new();
    for (constituency, m1) in m_later.iter() {
        if let Some(m0) = m_earlier.get(constituency) {
            rows.push(MarginShiftRow {
                constituency: constituency.to_string(),
                earlier_margin: *m0,
                later_margin: *m1,
                margin_diff: *m1 as i64 - *m0 as i64,
            });
        }
    }
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by_key(|r| std::cmp::Reverse(r.margin_diff));
    rows.truncate(n);
    Ok(rows)
}

fn margins(ds: &Dataset, year: u16) -> BTreeMap<String, u64> {
    winners(ds, year)
        .into_iter()
        .map(|(constituency, leader)| {
            let margin = match leader.runner_up {
                Some(ru) => leader.metric - ru,
                None => leader.metric,
            };
            (constituency.to_string(), margin)
        })
        .collect()
}

// **** 6/7. Party vote shares ****

#[derive(Debug, Clone, PartialEq)]
pub struct PartyShareRow {
    pub party: String,
    pub earlier_pct: f64,
    pub later_pct: f64,
}

/// National vote share per party for both cycles. Parties present in only
/// one cycle appear with a zero share on the missing side.
pub fn national_party_shares(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<PartyShareRow>> {
    let (earlier, later) = ds.years();
    party_shares(
        ds.cycle(earlier).collect::<Vec<_>>(),
        ds.cycle(later).collect::<Vec<_>>(),
        n,
    )
}

/// Vote share per party within one state, both cycles side by side.
pub fn state_party_shares(ds: &Dataset, state: &str) -> AnalyticsResult<Vec<PartyShareRow>> {
    let (earlier, later) = ds.years();
    let rows_earlier: Vec<&Record> = ds.cycle(earlier).filter(|r| r.state == state).collect();
    let rows_later: Vec<&Record> = ds.cycle(later).filter(|r| r.state == state).collect();
    party_shares(rows_earlier, rows_later, usize::MAX)
}

fn party_shares(
    rows_earlier: Vec<&Record>,
    rows_later: Vec<&Record>,
    n: usize,
) -> AnalyticsResult<Vec<PartyShareRow>> {
    if rows_earlier.is_empty() && rows_later.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let by_party_earlier = sum_votes_by(
        rows_earlier.into_iter(),
        |r| r.party.clone(),
        |r| r.total_votes,
    );
    let by_party_later = sum_votes_by(
        rows_later.into_iter(),
        |r| r.party.clone(),
        |r| r.total_votes,
    );
    let total_earlier: u64 = by_party_earlier.values().sum();
    let total_later: u64 = by_party_later.values().sum();

    let parties: BTreeSet<&String> = by_party_earlier.keys().chain(by_party_later.keys()).collect();
    let mut rows: Vec<PartyShareRow> = parties
        .into_iter()
        .map(|party| PartyShareRow {
            party: party.clone(),
            earlier_pct: pct(
                by_party_earlier.get(party).copied().unwrap_or(0) as f64,
                total_earlier as f64,
            ),
            later_pct: pct(
                by_party_later.get(party).copied().unwrap_or(0) as f64,
                total_later as f64,
            ),
        })
        .collect();
    rows.sort_by(|a, b| b.later_pct.total_cmp(&a.later_pct));
    if n != usize::MAX {
        rows.truncate(n);
    }
    Ok(rows)
}

// **** 8/9. Party vote gains and losses per constituency ****

#[derive(Debug, Clone, PartialEq)]
pub struct PartyVoteChangeRow {
    pub constituency: String,
    pub earlier_votes: u64,
    pub later_votes: u64,
    pub vote_diff: i64,
}

/// Constituencies where a party gained the most votes between cycles.
pub fn constituency_vote_gains(
    ds: &Dataset,
    party: &str,
    n: usize,
) -> AnalyticsResult<Vec<PartyVoteChangeRow>> {
    let mut rows = party_vote_changes(ds, party)?;
    rows.sort_by_key(|r| std::cmp::Reverse(r.vote_diff));
    rows.truncate(n);
    Ok(rows)
}

/// Constituencies where a party lost the most votes between cycles.
pub fn constituency_vote_losses(
    ds: &Dataset,
    party: &str,
    n: usize,
) -> AnalyticsResult<Vec<PartyVoteChangeRow>> {
    let mut rows = party_vote_changes(ds, party)?;
    rows.sort_by_key(|r| r.vote_diff);
    rows.truncate(n);
    Ok(rows)
}

/// Outer-joined per-constituency vote totals of one party; a side where
/// the party did not stand counts as zero, so new entrants and retreats
/// do not silently vanish.
fn party_vote_changes(ds: &Dataset, party: &str) -> AnalyticsResult<Vec<PartyVoteChangeRow>> {
    let wanted = normalized_party(party);
    let (earlier, later) = ds.years();
    let of_party = |r: &&Record| normalized_party(&r.party) == wanted;
    let by_pc_earlier = sum_votes_by(
        ds.cycle(earlier).filter(of_party),
        |r| r.constituency.clone(),
        |r| r.total_votes,
    );
    let by_pc_later = sum_votes_by(
        ds.cycle(later).filter(of_party),
        |r| r.constituency.clone(),
        |r| r.total_votes,
    );
    if by_pc_earlier.is_empty() && by_pc_later.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let constituencies: BTreeSet<&String> = by_pc_earlier.keys().chain(by_pc_later.keys()).collect();
    let rows = constituencies
        .into_iter()
        .map(|pc| {
            let v0 = by_pc_earlier.get(pc).copied().unwrap_or(0);
            let v1 = by_pc_later.get(pc).copied().unwrap_or(0);
            PartyVoteChangeRow {
                constituency: pc.clone(),
                earlier_votes: v0,
                later_votes: v1,
                vote_diff: v1 as i64 - v0 as i64,
            }
        })
        .collect();
    Ok(rows)
}

// **** 10/17. NOTA ****

#[derive(Debug, Clone, PartialEq)]
pub struct NotaRow {
    pub constituency: String,
    pub earlier_votes: u64,
    pub later_votes: u64,
    pub total: u64,
}

/// Constituencies with the highest combined NOTA votes across both cycles.
pub fn nota_hotspots(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<NotaRow>> {
    let mut rows = nota_by_constituency(ds)?;
    rows.sort_by_key(|r| std::cmp::Reverse(r.total));
    rows.truncate(n);
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotaStateRow {
    pub state: String,
    pub year: u16,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotaDistribution {
    pub by_state: Vec<NotaStateRow>,
    pub constituencies: Vec<NotaRow>,
}

/// NOTA votes per (state, year) plus the both-cycle constituency ranking.
pub fn nota_distribution(ds: &Dataset, n: usize) -> AnalyticsResult<NotaDistribution> {
    let by_state = sum_votes_by(
        ds.records().iter().filter(|r| is_nota(r)),
        |r| (r.state.clone(), r.year),
        |r| r.total_votes,
    )
    .into_iter()
    .map(|((state, year), votes)| NotaStateRow { state, year, votes })
    .collect();
    let mut constituencies = nota_by_constituency(ds)?;
    constituencies.sort_by_key(|r| std::cmp::Reverse(r.total));
    constituencies.truncate(n);
    Ok(NotaDistribution {
        by_state,
        constituencies,
    })
}

fn is_nota(r: &Record) -> bool {
    normalized_party(&r.party) == "NOTA"
}

fn nota_by_constituency(ds: &Dataset) -> AnalyticsResult<Vec<NotaRow>> {
    let (earlier, later) = ds.years();
    let by_pc_earlier = sum_votes_by(
        ds.cycle(earlier).filter(|r| is_nota(r)),
        |r| r.constituency.clone(),
        |r| r.total_votes,
    );
    let by_pc_later = sum_votes_by(
        ds.cycle(later).filter(|r| is_nota(r)),
        |r| r.constituency.clone(),
        |r| r.total_votes,
    );
    if by_pc_earlier.is_empty() && by_pc_later.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let constituencies: BTreeSet<&String> = by_pc_earlier.keys().chain(by_pc_later.keys()).collect();
    Ok(constituencies
        .into_iter()
        .map(|pc| {
            let v0 = by_pc_earlier.get(pc).copied().unwrap_or(0);
            let v1 = by_pc_later.get(pc).copied().unwrap_or(0);
            NotaRow {
                constituency: pc.clone(),
                earlier_votes: v0,
                later_votes: v1,
                total: v0 + v1,
            }
        })
        .collect())
}

// **** 11/16. Winners from low-share parties ****

#[derive(Debug, Clone, PartialEq)]
pub struct LowShareWinnerRow {
    pub constituency: String,
    pub state: String,
    pub party: String,
    pub candidate: String,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LowShareWinners {
    /// Winning candidates whose party stays below the state-share cutoff,
    /// ordered by (state, constituency).
    pub winners: Vec<LowShareWinnerRow>,
    /// How many such wins per state, most first.
    pub wins_by_state: Vec<(String, u64)>,
    /// How many such wins per party, most first.
    pub wins_by_party: Vec<(String, u64)>,
}

/// Constituency winners of one cycle whose party holds less than
/// `threshold_pct` of its state's total votes.
pub fn low_share_party_winners(
    ds: &Dataset,
    year: u16,
    threshold_pct: f64,
) -> AnalyticsResult<LowShareWinners> {
    ds.check_year(year)?;
    let state_party = sum_votes_by(
        ds.cycle(year),
        |r| (r.state.clone(), r.party.clone()),
        |r| r.total_votes,
    );
    let state_totals = sum_votes_by(ds.cycle(year), |r| r.state.clone(), |r| r.total_votes);
    let low: BTreeSet<(String, String)> = state_party
        .into_iter()
        .filter(|((state, _), votes)| {
            let total = state_totals.get(state).copied().unwrap_or(0);
            pct(*votes as f64, total as f64) < threshold_pct
        })
        .map(|(key, _)| key)
        .collect();
    debug!(
        "low_share_party_winners: {} (state, party) pairs below {}%",
        low.len(),
        threshold_pct
    );

    let mut rows: Vec<LowShareWinnerRow> = winners(ds, year)
        .into_iter()
        .filter(|(_, w)| low.contains(&(w.record.state.clone(), w.record.party.clone())))
        .map(|(constituency, w)| LowShareWinnerRow {
            constituency: constituency.to_string(),
            state: w.record.state.clone(),
            party: w.record.party.clone(),
            candidate: w.record.candidate.clone(),
            votes: w.metric,
        })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| (&a.state, &a.constituency).cmp(&(&b.state, &b.constituency)));

    let mut wins_by_state: Vec<(String, u64)> = count_by(rows.iter().map(|r| r.state.clone()));
    wins_by_state.sort_by_key(|(_, n)| std::cmp::Reverse(*n));
    let mut wins_by_party: Vec<(String, u64)> = count_by(rows.iter().map(|r| r.party.clone()));
    wins_by_party.sort_by_key(|(_, n)| std::cmp::Reverse(*n));

    Ok(LowShareWinners {
        winners: rows,
        wins_by_state,
        wins_by_party,
    })
}

fn count_by<I: Iterator<Item = String>>(keys: I) -> Vec<(String, u64)> {
    let mut acc: BTreeMap<String, u64> = BTreeMap::new();
    for k in keys {
        *acc.entry(k).or_insert(0) += 1;
    }
    acc.into_iter().collect()
}

// **** 12/13. State turnout change ****

#[derive(Debug, Clone, PartialEq)]
pub struct StateTurnoutChangeRow {
    pub state: String,
    pub earlier_pct: f64,
    pub later_pct: f64,
    pub change: f64,
}

/// States with the highest mean-turnout increase between cycles.
pub fn state_turnout_gains(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<StateTurnoutChangeRow>> {
    let mut rows = state_turnout_changes(ds)?;
    rows.sort_by(|a, b| b.change.total_cmp(&a.change));
    rows.truncate(n);
    Ok(rows)
}

/// States with the largest mean-turnout decline between cycles.
pub fn state_turnout_declines(
    ds: &Dataset,
    n: usize,
) -> AnalyticsResult<Vec<StateTurnoutChangeRow>> {
    let mut rows = state_turnout_changes(ds)?;
    rows.sort_by(|a, b| a.change.total_cmp(&b.change));
    rows.truncate(n);
    Ok(rows)
}

fn state_turnout_changes(ds: &Dataset) -> AnalyticsResult<Vec<StateTurnoutChangeRow>> {
    let (earlier, later) = ds.years();
    let t_earlier = state_mean_turnout(ds, earlier);
    let t_later = state_mean_turnout(ds, later);
    let rows: Vec<StateTurnoutChangeRow> = t_earlier
        .iter()
        .filter_map(|(state, p0)| {
            t_later.get(state).map(|p1| StateTurnoutChangeRow {
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
    Ok(rows)
}

// **** 14. Closest contests ****

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitiveRow {
    pub constituency: String,
    pub state: String,
    pub candidate: String,
    pub party: String,
    pub margin: u64,
}

/// The most competitive contests of one cycle: smallest winning margin on
/// the general-category vote. A single-candidate contest has margin zero.
pub fn closest_contests(ds: &Dataset, year: u16, n: usize) -> AnalyticsResult<Vec<CompetitiveRow>> {
    ds.check_year(year)?;
    if !ds.has_general_votes() {
        return Err(AnalyticsError::MissingColumn(Column::GeneralVotes));
    }
    let leaders = leaders_by(ds, year, |r| r.general_votes);
    if leaders.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<CompetitiveRow> = leaders
        .into_iter()
        .map(|(constituency, w)| CompetitiveRow {
            constituency: constituency.to_string(),
            state: w.record.state.clone(),
            candidate: w.record.candidate.clone(),
            party: w.record.party.clone(),
            margin: w.runner_up.map(|ru| w.metric - ru).unwrap_or(0),
        })
        .collect();
    rows.sort_by_key(|r| r.margin);
    rows.truncate(n);
    Ok(rows)
}

// **** 15. Vote share shifts per (constituency, party) ****

#[derive(Debug, Clone, PartialEq)]
pub struct ShareShiftRow {
    pub constituency: String,
    pub party: String,
    pub earlier_share: f64,
    pub later_share: f64,
    pub change: f64,
}

/// Largest shifts of a party's share of its constituency's votes, ranked
/// by absolute change. Only pairs standing in both cycles qualify.
pub fn vote_share_shifts(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<ShareShiftRow>> {
    let (earlier, later) = ds.years();
    let s_earlier = constituency_party_shares(ds, earlier);
    let s_later = constituency_party_shares(ds, later);
    let mut rows: Vec<ShareShiftRow> = s_earlier
        .iter()
        .filter_map(|(key, p0)| {
            s_later.get(key).map(|p1| ShareShiftRow {
                constituency: key.0.clone(),
                party: key.1.clone(),
                earlier_share: *p0,
                later_share: *p1,
                change: p1 - p0,
            })
        })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by(|a, b| b.change.abs().total_cmp(&a.change.abs()));
    rows.truncate(n);
    Ok(rows)
}

fn constituency_party_shares(ds: &Dataset, year: u16) -> BTreeMap<(String, String), f64> {
    let by_pc_party = sum_votes_by(
        ds.cycle(year),
        |r| (r.constituency.clone(), r.party.clone()),
        |r| r.total_votes,
    );
    let pc_totals = sum_votes_by(ds.cycle(year), |r| r.constituency.clone(), |r| r.total_votes);
    by_pc_party
        .into_iter()
        .map(|((pc, party), votes)| {
            let total = pc_totals.get(&pc).copied().unwrap_or(0);
            let share = pct(votes as f64, total as f64);
            ((pc, party), share)
        })
        .collect()
}

// **** 18. Parties gaining constituencies ****

#[derive(Debug, Clone, PartialEq)]
pub struct PartyGainRow {
    pub party: String,
    pub gains: u64,
}

/// Parties counted by the constituencies they took over in the later
/// cycle (seats where the winning party changed).
pub fn party_constituency_gains(ds: &Dataset) -> AnalyticsResult<Vec<PartyGainRow>> {
    let (earlier, later) = ds.years();
    let w_earlier = winners(ds, earlier);
    let w_later = winners(ds, later);
    let changed = w_later.iter().filter(|(constituency, w1)| {
        w_earlier
            .get(*constituency)
            .map(|w0| normalized_party(&w0.record.party) != normalized_party(&w1.record.party))
            .unwrap_or(false)
    });
    let mut rows: Vec<PartyGainRow> = count_by(changed.map(|(_, w1)| w1.record.party.clone()))
        .into_iter()
        .map(|(party, gains)| PartyGainRow { party, gains })
        .collect();
    if rows.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    rows.sort_by_key(|r| std::cmp::Reverse(r.gains));
    Ok(rows)
}

// **** 19. Consistent turnout extremes ****

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistentTurnoutRow {
    pub constituency: String,
    pub earlier_pct: f64,
    pub later_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistentTurnout {
    /// In the top decile of turnout in both cycles.
    pub high: Vec<ConsistentTurnoutRow>,
    /// In the bottom decile of turnout in both cycles.
    pub low: Vec<ConsistentTurnoutRow>,
}

/// Constituencies sitting in the same turnout extreme (top or bottom 10%)
/// in both cycles. Only constituencies present in both cycles qualify.
pub fn consistent_turnout_extremes(ds: &Dataset) -> AnalyticsResult<ConsistentTurnout> {
    let (earlier, later) = ds.years();
    let t_earlier = constituency_totals(ds, earlier);
    let t_later = constituency_totals(ds, later);

    let paired: Vec<ConsistentTurnoutRow> = t_earlier
        .iter()
        .filter_map(|(pc, t0)| {
            t_later.get(pc).map(|t1| ConsistentTurnoutRow {
                constituency: pc.clone(),
                earlier_pct: t0.turnout_pct(),
                later_pct: t1.turnout_pct(),
            })
        })
        .collect();
    if paired.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }

    let mut sorted_earlier: Vec<f64> = paired.iter().map(|r| r.earlier_pct).collect();
    sorted_earlier.sort_by(f64::total_cmp);
    let mut sorted_later: Vec<f64> = paired.iter().map(|r| r.later_pct).collect();
    sorted_later.sort_by(f64::total_cmp);

    let hi_earlier = quantile(&sorted_earlier, 0.9);
    let hi_later = quantile(&sorted_later, 0.9);
    let lo_earlier = quantile(&sorted_earlier, 0.1);
    let lo_later = quantile(&sorted_later, 0.1);

    let high = paired
        .iter()
        .filter(|r| r.earlier_pct >= hi_earlier && r.later_pct >= hi_later)
        .cloned()
        .collect();
    let low = paired
        .iter()
        .filter(|r| r.earlier_pct <= lo_earlier && r.later_pct <= lo_later)
        .cloned()
        .collect();
    Ok(ConsistentTurnout { high, low })
}

// **** 20. Age group contributions ****

#[derive(Debug, Clone, PartialEq)]
pub struct AgeGroupChangeRow {
    pub age_group: &'static str,
    pub earlier_votes: u64,
    pub later_votes: u64,
    pub change: i64,
}

/// Change of general-category votes per candidate age group between the
/// cycles, ranked by absolute change. Needs the age and general-votes
/// columns.
pub fn age_group_vote_changes(ds: &Dataset) -> AnalyticsResult<Vec<AgeGroupChangeRow>> {
    if !ds.has_age() {
        return Err(AnalyticsError::MissingColumn(Column::Age));
    }
    if !ds.has_general_votes() {
        return Err(AnalyticsError::MissingColumn(Column::GeneralVotes));
    }
    let (earlier, later) = ds.years();
    let mut acc: BTreeMap<&'static str, (u64, u64)> = BTreeMap::new();
    for r in ds.records() {
        let (age, votes) = match (r.age, r.general_votes) {
            (Some(a), Some(v)) => (a, v),
            _ => continue,
        };
        let group = match age_group(age) {
            Some(g) => g,
            None => continue,
        };
        let e = acc.entry(group).or_insert((0, 0));
        if r.year == earlier {
            e.0 += votes;
        } else if r.year == later {
            e.1 += votes;
        }
    }
    if acc.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let mut rows: Vec<AgeGroupChangeRow> = acc
        .into_iter()
        .map(|(age_group, (v0, v1))| AgeGroupChangeRow {
            age_group,
            earlier_votes: v0,
            later_votes: v1,
            change: v1 as i64 - v0 as i64,
        })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r.change.abs()));
    Ok(rows)
}

// **** 21. Youth turnout shifts ****

#[derive(Debug, Clone, PartialEq)]
pub struct YouthShiftRow {
    pub constituency: String,
    pub state: String,
    /// The later cycle's winning party, when the constituency stood then.
    pub winner_party: Option<String>,
    pub earlier_pct: f64,
    pub later_pct: f64,
    pub change: f64,
}

/// Constituencies with the highest increase of the youth (18-25) share of
/// the general-category vote, joined with the later cycle's winner. Needs
/// the age and general-votes columns.
pub fn youth_turnout_shifts(ds: &Dataset, n: usize) -> AnalyticsResult<Vec<YouthShiftRow>> {
    if !ds.has_age() {
        return Err(AnalyticsError::MissingColumn(Column::Age));
    }
    if !ds.has_general_votes() {
        return Err(AnalyticsError::MissingColumn(Column::GeneralVotes));
    }
    let (earlier, later) = ds.years();
    let p_earlier = youth_share(ds, earlier);
    let p_later = youth_share(ds, later);
    if p_earlier.is_empty() && p_later.is_empty() {
        return Err(AnalyticsError::NoMatchingRows);
    }
    let w_later = winners(ds, later);

    let constituencies: BTreeSet<&String> = p_earlier.keys().chain(p_later.keys()).collect();
    let mut rows: Vec<YouthShiftRow> = constituencies
        .into_iter()
        .map(|pc| {
            let (state0, pct0) = p_earlier.get(pc).cloned().unwrap_or_default();
            let (state1, pct1) = p_later.get(pc).cloned().unwrap_or_default();
            let state = if state1.is_empty() { state0 } else { state1 };
            YouthShiftRow {
                constituency: pc.clone(),
                state,
                winner_party: w_later.get(pc.as_str()).map(|w| w.record.party.clone()),
                earlier_pct: pct0,
                later_pct: pct1,
                change: pct1 - pct0,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.change.total_cmp(&a.change));
    rows.truncate(n);
    Ok(rows)
}

/// Youth general votes as a share of the constituency's highest candidate
/// tally, keyed by constituency, with the state carried along.
fn youth_share(ds: &Dataset, year: u16) -> BTreeMap<String, (String, f64)> {
    let youth = sum_votes_by(
        ds.cycle(year)
            .filter(|r| matches!(r.age, Some(a) if (18..=25).contains(&a)) && r.general_votes.is_some()),
        |r| r.constituency.clone(),
        |r| r.general_votes.unwrap_or(0),
    );
    let mut denom: BTreeMap<String, u64> = BTreeMap::new();
    let mut states: BTreeMap<String, String> = BTreeMap::new();
    for r in ds.cycle(year) {
        let e = denom.entry(r.constituency.clone()).or_insert(0);
        *e = (*e).max(r.total_votes);
        states
            .entry(r.constituency.clone())
            .or_insert_with(|| r.state.clone());
    }
    youth
        .into_iter()
        .map(|(pc, v)| {
            let d = denom.get(&pc).copied().unwrap_or(0);
            let state = states.get(&pc).cloned().unwrap_or_default();
            let share = pct(v as f64, d as f64);
            (pc, (state, share))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;
    use crate::RawRecord;

    /// The worked two-cycle fixture: constituency "X" flips from party A
    /// to party B, "Y" stays with party C.
    fn fixture() -> crate::Dataset {
        dataset(vec![
            rec("X", "S1", 2014, "A", "a1", 60_000, 100_000),
            rec("X", "S1", 2014, "B", "b1", 40_000, 100_000),
            rec("Y", "S2", 2014, "C", "c1", 30_000, 100_000),
            rec("Y", "S2", 2014, "D", "d1", 20_000, 100_000),
            rec("X", "S1", 2019, "B", "b1", 55_000, 100_000),
            rec("X", "S1", 2019, "C", "c2", 45_000, 100_000),
            rec("Y", "S2", 2019, "C", "c1", 40_000, 100_000),
            rec("Y", "S2", 2019, "D", "d1", 10_000, 100_000),
        ])
    }

    #[test]
    fn turnout_margin_winner_scenario() {
        let ds = fixture();
        let ex = constituency_turnout_extremes(&ds, 2014, 10).unwrap();
        let x = ex.top.iter().find(|r| r.constituency == "X").unwrap();
        assert_eq!(x.turnout_pct, 100.0);

        let shifts = winning_margin_shifts(&ds, 10).unwrap();
        let x = shifts.iter().find(|r| r.constituency == "X").unwrap();
        assert_eq!(x.earlier_margin, 20_000);
        assert_eq!(x.later_margin, 10_000);
        assert_eq!(x.margin_diff, -10_000);
    }

    #[test]
    fn flipped_seats_selects_changed_winner_with_abs_pct_diff() {
        let ds = fixture();
        let rows = flipped_seats(&ds, 10).unwrap();
        assert_eq!(rows.len(), 1);
        let x = &rows[0];
        assert_eq!(x.constituency, "X");
        assert_eq!(x.earlier_party, "A");
        assert_eq!(x.later_party, "B");
        assert!((x.earlier_vote_pct - 60.0).abs() < 1e-9);
        assert!((x.later_vote_pct - 55.0).abs() < 1e-9);
        assert!((x.vote_pct_diff - 5.0).abs() < 1e-9);
    }

    #[test]
    fn repeat_winners_exclude_flipped_seats() {
        let ds = fixture();
        let rows = repeat_winner_strongholds(&ds, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].constituency, "Y");
        assert_eq!(rows[0].party, "C");
        assert!((rows[0].vote_pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn party_matching_ignores_case_and_whitespace() {
        let ds = dataset(vec![
            rec("X", "S", 2014, " bjp ", "a1", 60_000, 100_000),
            rec("X", "S", 2019, "BJP", "a1", 50_000, 100_000),
        ]);
        let rows = repeat_winner_strongholds(&ds, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(flipped_seats(&ds, 10).is_err());
    }

    #[test]
    fn national_shares_sum_to_100_per_cycle() {
        let ds = fixture();
        let rows = national_party_shares(&ds, usize::MAX).unwrap();
        let sum_earlier: f64 = rows.iter().map(|r| r.earlier_pct).sum();
        let sum_later: f64 = rows.iter().map(|r| r.later_pct).sum();
        assert!((sum_earlier - 100.0).abs() < 1e-9);
        assert!((sum_later - 100.0).abs() < 1e-9);
        // Party A stood only in the earlier cycle but must not vanish.
        let a = rows.iter().find(|r| r.party == "A").unwrap();
        assert_eq!(a.later_pct, 0.0);
    }

    #[test]
    fn state_shares_cover_single_state() {
        let ds = fixture();
        let rows = state_party_shares(&ds, "S1").unwrap();
        let sum_later: f64 = rows.iter().map(|r| r.later_pct).sum();
        assert!((sum_later - 100.0).abs() < 1e-9);
        assert!(state_party_shares(&ds, "nowhere").is_err());
    }

    #[test]
    fn vote_changes_outer_join_fills_missing_side_with_zero() {
        let ds = fixture();
        // Party A stood in X in 2014 only: the loss must still show up.
        let losses = constituency_vote_losses(&ds, "A", 10).unwrap();
        assert_eq!(losses[0].constituency, "X");
        assert_eq!(losses[0].earlier_votes, 60_000);
        assert_eq!(losses[0].later_votes, 0);
        assert_eq!(losses[0].vote_diff, -60_000);

        let gains = constituency_vote_gains(&ds, "C", 10).unwrap();
        let x = gains.iter().find(|r| r.constituency == "X").unwrap();
        assert_eq!(x.earlier_votes, 0);
        assert_eq!(x.vote_diff, 45_000);
    }

    #[test]
    fn nota_totals_rank_across_cycles() {
        let mut raws = vec![
            rec("X", "S", 2014, "A", "a1", 60_000, 100_000),
            rec("X", "S", 2014, "NOTA", "NOTA", 500, 100_000),
            rec("X", "S", 2019, "A", "a1", 60_000, 100_000),
            rec("X", "S", 2019, "NOTA", "NOTA", 700, 100_000),
            rec("Y", "S", 2014, "NOTA", "NOTA", 1_000, 100_000),
        ];
        raws.push(rec("Y", "S", 2019, "A", "a1", 10, 100));
        let ds = dataset(raws);
        let rows = nota_hotspots(&ds, 10).unwrap();
        assert_eq!(rows[0].constituency, "X");
        assert_eq!(rows[0].total, 1_200);
        assert_eq!(rows[1].constituency, "Y");
        assert_eq!(rows[1].total, 1_000);
    }

    #[test]
    fn low_share_winner_is_found() {
        // A small party takes one seat while holding ~5% of its state.
        let ds = dataset(vec![
            rec("X", "S", 2014, "A", "a1", 90_000, 100_000),
            rec("X", "S", 2019, "A", "a1", 90_000, 100_000),
            rec("Y", "S", 2019, "A", "a2", 4_000, 100_000),
            rec("Y", "S", 2019, "Z", "z1", 5_000, 100_000),
        ]);
        // Z holds 5000/99000 ~ 5.05% of the state but wins Y.
        let res = low_share_party_winners(&ds, 2019, 10.0).unwrap();
        assert_eq!(res.winners.len(), 1);
        assert_eq!(res.winners[0].constituency, "Y");
        assert_eq!(res.winners[0].party, "Z");
        assert_eq!(res.wins_by_party, vec![("Z".to_string(), 1)]);
    }

    #[test]
    fn turnout_change_is_antisymmetric() {
        let ds = fixture();
        let gains = state_turnout_gains(&ds, usize::MAX).unwrap();

        // Same records with the cycle labels swapped.
        let swapped: Vec<RawRecord> = ds
            .records()
            .iter()
            .map(|r| RawRecord {
                constituency: r.constituency.clone(),
                state: r.state.clone(),
                year: if r.year == 2014 { 2019 } else { 2014 },
                party: r.party.clone(),
                candidate: r.candidate.clone(),
                total_votes: r.total_votes,
                total_electors: r.total_electors,
                general_votes: r.general_votes,
                age: r.age,
            })
            .collect();
        let ds_swapped = dataset(swapped);
        let gains_swapped = state_turnout_gains(&ds_swapped, usize::MAX).unwrap();
        for row in gains.iter() {
            let other = gains_swapped
                .iter()
                .find(|r| r.state == row.state)
                .unwrap();
            assert!((row.change + other.change).abs() < 1e-9);
        }
    }

    #[test]
    fn pipelines_are_idempotent() {
        let ds = fixture();
        assert_eq!(
            flipped_seats(&ds, 10).unwrap(),
            flipped_seats(&ds, 10).unwrap()
        );
        assert_eq!(
            national_party_shares(&ds, 30).unwrap(),
            national_party_shares(&ds, 30).unwrap()
        );
        assert_eq!(
            vote_share_shifts(&ds, 20).unwrap(),
            vote_share_shifts(&ds, 20).unwrap()
        );
    }

    #[test]
    fn closest_contests_need_general_votes() {
        let ds = fixture();
        assert_eq!(
            closest_contests(&ds, 2019, 10).unwrap_err(),
            AnalyticsError::MissingColumn(Column::GeneralVotes)
        );

        let mut raws = Vec::new();
        for (pc, cand, votes) in [("X", "a1", 50_000u64), ("X", "b1", 49_000), ("Y", "c1", 9_000)] {
            let mut r = rec(pc, "S", 2019, "P", cand, votes, 100_000);
            r.general_votes = Some(votes);
            raws.push(r);
        }
        raws.push(rec("X", "S", 2014, "P", "a1", 1, 100));
        let ds = dataset(raws);
        let rows = closest_contests(&ds, 2019, 10).unwrap();
        // Single-candidate Y has margin 0 and ranks first.
        assert_eq!(rows[0].constituency, "Y");
        assert_eq!(rows[0].margin, 0);
        assert_eq!(rows[1].constituency, "X");
        assert_eq!(rows[1].margin, 1_000);
    }

    #[test]
    fn share_shifts_use_inner_join() {
        let ds = fixture();
        let rows = vote_share_shifts(&ds, 20).unwrap();
        // Party A (X, 2014 only) and party C in X (2019 only) are excluded.
        assert!(rows.iter().all(|r| !(r.constituency == "X" && r.party == "A")));
        assert!(rows.iter().all(|r| !(r.constituency == "X" && r.party == "C")));
        // Party B in X: 40% -> 55% of constituency votes.
        let b = rows
            .iter()
            .find(|r| r.constituency == "X" && r.party == "B")
            .unwrap();
        assert!((b.change - 15.0).abs() < 1e-9);
    }

    #[test]
    fn party_gains_count_flipped_seats_only() {
        let ds = fixture();
        let rows = party_constituency_gains(&ds).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].party, "B");
        assert_eq!(rows[0].gains, 1);
    }

    #[test]
    fn consistent_extremes_classify_both_cycles() {
        let mut raws = Vec::new();
        // Ten constituencies with spread-out turnouts, stable across cycles.
        for i in 0..10u64 {
            let votes = 10_000 * (i + 1);
            raws.push(rec(&format!("C{:02}", i), "S", 2014, "P", "x", votes, 100_000));
            raws.push(rec(&format!("C{:02}", i), "S", 2019, "P", "x", votes, 100_000));
        }
        let ds = dataset(raws);
        let res = consistent_turnout_extremes(&ds).unwrap();
        assert_eq!(res.high.len(), 1);
        assert_eq!(res.high[0].constituency, "C09");
        assert_eq!(res.low.len(), 1);
        assert_eq!(res.low[0].constituency, "C00");
    }

    #[test]
    fn age_groups_require_both_columns() {
        let ds = fixture();
        assert_eq!(
            age_group_vote_changes(&ds).unwrap_err(),
            AnalyticsError::MissingColumn(Column::Age)
        );

        let mut raws = Vec::new();
        for (year, age, votes) in [(2014u16, 22u32, 1_000u64), (2019, 22, 3_000), (2019, 40, 500)] {
            let mut r = rec("X", "S", year, "P", "c", votes, 100_000);
            r.age = Some(age);
            r.general_votes = Some(votes);
            raws.push(r);
        }
        let ds = dataset(raws);
        let rows = age_group_vote_changes(&ds).unwrap();
        assert_eq!(rows[0].age_group, "18-24");
        assert_eq!(rows[0].change, 2_000);
        let older = rows.iter().find(|r| r.age_group == "35-44").unwrap();
        assert_eq!(older.earlier_votes, 0);
        assert_eq!(older.later_votes, 500);
    }

    #[test]
    fn youth_shifts_join_the_later_winner() {
        let mut raws = Vec::new();
        for (year, party, cand, age, votes) in [
            (2014u16, "A", "young_a", 22u32, 10_000u64),
            (2014, "B", "old_b", 50, 40_000),
            (2019, "A", "young_a", 27, 30_000),
            (2019, "B", "young_b", 24, 45_000),
        ] {
            let mut r = rec("X", "S", year, party, cand, votes, 100_000);
            r.age = Some(age);
            r.general_votes = Some(votes);
            raws.push(r);
        }
        let ds = dataset(raws);
        let rows = youth_turnout_shifts(&ds, 20).unwrap();
        assert_eq!(rows.len(), 1);
        let x = &rows[0];
        // 2014: youth 10000 over max tally 40000 = 25%;
        // 2019: youth 45000 over max tally 45000 = 100%.
        assert!((x.earlier_pct - 25.0).abs() < 1e-9);
        assert!((x.later_pct - 100.0).abs() < 1e-9);
        assert_eq!(x.winner_party.as_deref(), Some("B"));
    }

    #[test]
    fn unknown_year_is_rejected() {
        let ds = fixture();
        assert_eq!(
            constituency_turnout_extremes(&ds, 2009, 10).unwrap_err(),
            AnalyticsError::UnknownYear(2009)
        );
    }
}
