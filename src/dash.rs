//! The dashboard driver: loads the base table, runs the requested slice of
//! the question menu (or the explorer views), prints text tables and
//! assembles the JSON summary.
//!
//! A failing question degrades to an inline note and the rest of the menu
//! keeps running; only input problems abort the whole run.

use std::fs;

use log::{info, warn};
use snafu::{prelude::*, Snafu};

use serde::Serialize;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use election_analytics::questions;
use election_analytics::{explore, AnalyticsError, Dataset, FilterSelection};

use crate::args::Args;
use crate::dash::render::{fmt_f64, Table};

pub mod filters;
pub mod geo;
pub mod io_csv;
pub mod render;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading CSV data from {path}"))]
    ReadingCsv { source: csv::Error, path: String },
    #[snafu(display("Missing column '{name}' in {path}"))]
    MissingInputColumn { name: String, path: String },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The map file carries no recognizable region names"))]
    NoRegionNames {},
    #[snafu(display("The loaded records do not form a usable table: {source}"))]
    BuildingDataset { source: AnalyticsError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
struct DatasetMeta {
    records: usize,
    #[serde(rename = "earlierYear")]
    earlier_year: u16,
    #[serde(rename = "laterYear")]
    later_year: u16,
    #[serde(rename = "hasAge")]
    has_age: bool,
    #[serde(rename = "hasGeneralVotes")]
    has_general_votes: bool,
}

pub fn run(args: &Args) -> DashResult<()> {
    let ds = load_dataset(args)?;
    let (earlier, later) = ds.years();
    info!(
        "loaded {} records covering the {} and {} cycles",
        ds.records().len(),
        earlier,
        later
    );
    let meta = DatasetMeta {
        records: ds.records().len(),
        earlier_year: earlier,
        later_year: later,
        has_age: ds.has_age(),
        has_general_votes: ds.has_general_votes(),
    };

    let sections = if args.explore {
        run_explore(args, &ds)?
    } else {
        run_questions(args, &ds)?
    };
    let summary = json!({ "dataset": meta, "results": sections });
    let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty),
        Some(path) => fs::write(path, &pretty).context(OpeningInputSnafu {
            path: path.to_string(),
        })?,
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let summary_ref = read_summary(reference_path)?;
        let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_ref != pretty {
            warn!("Found differences with the reference summary");
            print_diff(pretty_ref.as_str(), pretty.as_str(), "\n");
            whatever!("Difference detected between computed summary and reference summary")
        }
    }
    Ok(())
}

fn load_dataset(args: &Args) -> DashResult<Dataset> {
    match (&args.input, &args.input_earlier, &args.input_later) {
        (Some(path), None, None) => io_csv::load_combined(path),
        (None, Some(earlier), Some(later)) => {
            io_csv::load_pair(earlier, later, args.earlier_year, args.later_year)
        }
        _ => whatever!("Give either --input, or both --input-earlier and --input-later"),
    }
}

fn read_summary(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningInputSnafu {
        path: path.to_string(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// **** The question menu ****

fn question_ids(args: &Args) -> DashResult<Vec<u32>> {
    if args.question == "all" {
        return Ok((1..=21).collect());
    }
    match args.question.parse::<u32>() {
        Ok(n) if (1..=21).contains(&n) => Ok(vec![n]),
        _ => whatever!(
            "--question must be a number from 1 to 21 or 'all', got {:?}",
            args.question
        ),
    }
}

fn run_questions(args: &Args, ds: &Dataset) -> DashResult<Vec<JSValue>> {
    let mut sections: Vec<JSValue> = Vec::new();
    for id in question_ids(args)? {
        let section = match compute_question(ds, id, args) {
            Ok((title, data)) => json!({ "question": id, "title": title, "data": data }),
            Err(e) => {
                warn!("question {}: {}", id, e);
                println!("\n[{}] not available: {}", id, e);
                json!({ "question": id, "note": e.to_string() })
            }
        };
        sections.push(section);
    }
    Ok(sections)
}

fn turnout_js(rows: &[questions::ConstituencyTurnoutRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "constituency": r.constituency,
                "state": r.state,
                "turnoutPct": r.turnout_pct
            })
        })
        .collect()
}

fn state_turnout_js(rows: &[questions::StateTurnoutRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| json!({ "state": r.state, "avgTurnoutPct": r.avg_turnout_pct }))
        .collect()
}

fn vote_change_js(rows: &[questions::PartyVoteChangeRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "constituency": r.constituency,
                "earlierVotes": r.earlier_votes,
                "laterVotes": r.later_votes,
                "voteDiff": r.vote_diff
            })
        })
        .collect()
}

fn vote_change_table(rows: &[questions::PartyVoteChangeRow], title: &str) {
    let mut table = Table::new(&["constituency", "earlier votes", "later votes", "diff"]);
    for r in rows {
        table.row(vec![
            r.constituency.clone(),
            r.earlier_votes.to_string(),
            r.later_votes.to_string(),
            r.vote_diff.to_string(),
        ]);
    }
    table.print(title);
}

fn nota_js(rows: &[questions::NotaRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "constituency": r.constituency,
                "earlierVotes": r.earlier_votes,
                "laterVotes": r.later_votes,
                "total": r.total
            })
        })
        .collect()
}

fn state_change_js(rows: &[questions::StateTurnoutChangeRow]) -> Vec<JSValue> {
    rows.iter()
        .map(|r| {
            json!({
                "state": r.state,
                "earlierPct": r.earlier_pct,
                "laterPct": r.later_pct,
                "change": r.change
            })
        })
        .collect()
}

fn state_change_table(rows: &[questions::StateTurnoutChangeRow], title: &str) {
    let mut table = Table::new(&["state", "earlier %", "later %", "change"]);
    for r in rows {
        table.row(vec![
            r.state.clone(),
            fmt_f64(r.earlier_pct),
            fmt_f64(r.later_pct),
            fmt_f64(r.change),
        ]);
    }
    table.print(title);
}

fn low_share_js(res: &questions::LowShareWinners) -> JSValue {
    json!({
        "winners": res.winners.iter().map(|r| json!({
            "constituency": r.constituency,
            "state": r.state,
            "party": r.party,
            "candidate": r.candidate,
            "votes": r.votes
        })).collect::<Vec<JSValue>>(),
        "winsByState": res.wins_by_state.iter()
            .map(|(state, n)| json!({ "state": state, "wins": n }))
            .collect::<Vec<JSValue>>(),
        "winsByParty": res.wins_by_party.iter()
            .map(|(party, n)| json!({ "party": party, "wins": n }))
            .collect::<Vec<JSValue>>(),
    })
}

fn low_share_tables(res: &questions::LowShareWinners, id: u32, year: u16) {
    let mut winners = Table::new(&["state", "constituency", "party", "candidate", "votes"]);
    for r in &res.winners {
        winners.row(vec![
            r.state.clone(),
            r.constituency.clone(),
            r.party.clone(),
            r.candidate.clone(),
            r.votes.to_string(),
        ]);
    }
    winners.print(&format!("[{}] Winners from small parties ({})", id, year));
    let mut by_state = Table::new(&["state", "wins"]);
    for (state, n) in &res.wins_by_state {
        by_state.row(vec![state.clone(), n.to_string()]);
    }
    by_state.print(&format!("[{}] ... by state", id));
    let mut by_party = Table::new(&["party", "wins"]);
    for (party, n) in &res.wins_by_party {
        by_party.row(vec![party.clone(), n.to_string()]);
    }
    by_party.print(&format!("[{}] ... by party", id));
}

/// The cycles a single-cycle question runs over: the chosen one, or both
/// side by side when no --year is given.
fn single_or_both(year: Option<u16>, earlier: u16, later: u16) -> Vec<u16> {
    match year {
        Some(y) => vec![y],
        None => vec![earlier, later],
    }
}

/// Runs one variant of a question per item (a cycle, a party). A failing
/// variant degrades to an inline note; the question as a whole only fails
/// when every variant failed.
fn question_variants<T, F>(id: u32, items: &[T], mut f: F) -> Result<JSValue, AnalyticsError>
where
    T: std::fmt::Display,
    F: FnMut(&T) -> Result<JSValue, AnalyticsError>,
{
    let mut sections: Vec<JSValue> = Vec::new();
    let mut last_err: Option<AnalyticsError> = None;
    for item in items {
        match f(item) {
            Ok(js) => sections.push(js),
            Err(e) => {
                warn!("question {} ({}): {}", id, item, e);
                println!("\n[{}] {} not available: {}", id, item, e);
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) if sections.is_empty() => Err(e),
        _ => Ok(json!(sections)),
    }
}

fn compute_question(
    ds: &Dataset,
    id: u32,
    args: &Args,
) -> Result<(String, JSValue), AnalyticsError> {
    let (earlier, later) = ds.years();
    let n = args.top;
    match id {
        1 => {
            let years = single_or_both(args.year, earlier, later);
            let data = question_variants(1, &years, |&year| {
                let ex = questions::constituency_turnout_extremes(ds, year, n)?;
                for (rows, label) in [(&ex.top, "Highest"), (&ex.bottom, "Lowest")] {
                    let mut table = Table::new(&["constituency", "state", "turnout %"]);
                    for r in rows.iter() {
                        table.row(vec![
                            r.constituency.clone(),
                            r.state.clone(),
                            fmt_f64(r.turnout_pct),
                        ]);
                    }
                    table.print(&format!("[1] {}-turnout constituencies ({})", label, year));
                }
                Ok(json!({
                    "year": year,
                    "top": turnout_js(&ex.top),
                    "bottom": turnout_js(&ex.bottom)
                }))
            })?;
            Ok(("Turnout extremes by constituency".to_string(), data))
        }
        2 => {
            let years = single_or_both(args.year, earlier, later);
            let data = question_variants(2, &years, |&year| {
                let ex = questions::state_turnout_extremes(ds, year, n)?;
                for (rows, label) in [(&ex.top, "Highest"), (&ex.bottom, "Lowest")] {
                    let mut table = Table::new(&["state", "avg turnout %"]);
                    for r in rows.iter() {
                        table.row(vec![r.state.clone(), fmt_f64(r.avg_turnout_pct)]);
                    }
                    table.print(&format!("[2] {}-turnout states ({})", label, year));
                }
                Ok(json!({
                    "year": year,
                    "top": state_turnout_js(&ex.top),
                    "bottom": state_turnout_js(&ex.bottom)
                }))
            })?;
            Ok(("Turnout extremes by state".to_string(), data))
        }
        3 => {
            let rows = questions::repeat_winner_strongholds(ds, n)?;
            let mut table = Table::new(&["constituency", "party", "vote %"]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.party.clone(),
                    fmt_f64(r.vote_pct),
                ]);
            }
            table.print("[3] Constituencies kept by the same party");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "party": r.party,
                        "votePct": r.vote_pct
                    })
                })
                .collect();
            Ok(("Strongholds of repeat winners".to_string(), json!(data)))
        }
        4 => {
            let rows = questions::flipped_seats(ds, n)?;
            let mut table = Table::new(&[
                "constituency",
                "earlier party",
                "later party",
                "earlier %",
                "later %",
                "diff",
            ]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.earlier_party.clone(),
                    r.later_party.clone(),
                    fmt_f64(r.earlier_vote_pct),
                    fmt_f64(r.later_vote_pct),
                    fmt_f64(r.vote_pct_diff),
                ]);
            }
            table.print("[4] Seats won by a different party");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "earlierParty": r.earlier_party,
                        "laterParty": r.later_party,
                        "earlierVotePct": r.earlier_vote_pct,
                        "laterVotePct": r.later_vote_pct,
                        "votePctDiff": r.vote_pct_diff
                    })
                })
                .collect();
            Ok(("Flipped seats".to_string(), json!(data)))
        }
        5 => {
            let rows = questions::winning_margin_shifts(ds, n)?;
            let mut table =
                Table::new(&["constituency", "earlier margin", "later margin", "diff"]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.earlier_margin.to_string(),
                    r.later_margin.to_string(),
                    r.margin_diff.to_string(),
                ]);
            }
            table.print("[5] Largest winning-margin increases");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "earlierMargin": r.earlier_margin,
                        "laterMargin": r.later_margin,
                        "marginDiff": r.margin_diff
                    })
                })
                .collect();
            Ok(("Winning margin shifts".to_string(), json!(data)))
        }
        6 | 7 => {
            let rows = if id == 6 {
                questions::national_party_shares(ds, n)?
            } else {
                questions::state_party_shares(ds, &args.state)?
            };
            let title = if id == 6 {
                "[6] National party vote shares".to_string()
            } else {
                format!("[7] Party vote shares in {}", args.state)
            };
            let mut table = Table::new(&[
                "party",
                &format!("{} %", earlier),
                &format!("{} %", later),
            ]);
            for r in &rows {
                table.row(vec![
                    r.party.clone(),
                    fmt_f64(r.earlier_pct),
                    fmt_f64(r.later_pct),
                ]);
            }
            table.print(&title);
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "party": r.party,
                        "earlierPct": r.earlier_pct,
                        "laterPct": r.later_pct
                    })
                })
                .collect();
            let title = if id == 6 {
                "National party shares".to_string()
            } else {
                format!("Party shares in {}", args.state)
            };
            Ok((title, json!(data)))
        }
        8 => {
            let data = question_variants(8, &args.party, |party| {
                let rows = questions::constituency_vote_gains(ds, party, n)?;
                vote_change_table(&rows, &format!("[8] Biggest vote gains of {}", party));
                Ok(json!({ "party": party, "rows": vote_change_js(&rows) }))
            })?;
            Ok(("Vote gains by party".to_string(), data))
        }
        9 => {
            let data = question_variants(9, &args.party, |party| {
                let rows = questions::constituency_vote_losses(ds, party, n)?;
                vote_change_table(&rows, &format!("[9] Biggest vote losses of {}", party));
                Ok(json!({ "party": party, "rows": vote_change_js(&rows) }))
            })?;
            Ok(("Vote losses by party".to_string(), data))
        }
        10 => {
            let rows = questions::nota_hotspots(ds, n)?;
            let mut table =
                Table::new(&["constituency", "earlier votes", "later votes", "total"]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.earlier_votes.to_string(),
                    r.later_votes.to_string(),
                    r.total.to_string(),
                ]);
            }
            table.print("[10] Constituencies with the most NOTA votes");
            Ok(("NOTA hotspots".to_string(), json!(nota_js(&rows))))
        }
        11 => {
            // Asked about the later cycle: the question is who holds a seat
            // now despite a small state-wide base.
            let res = questions::low_share_party_winners(ds, later, args.threshold)?;
            low_share_tables(&res, 11, later);
            Ok((
                format!("Winners from small parties ({})", later),
                low_share_js(&res),
            ))
        }
        12 => {
            let rows = questions::state_turnout_gains(ds, n)?;
            state_change_table(&rows, "[12] States with rising turnout");
            Ok(("State turnout gains".to_string(), json!(state_change_js(&rows))))
        }
        13 => {
            let rows = questions::state_turnout_declines(ds, n)?;
            state_change_table(&rows, "[13] States with falling turnout");
            Ok((
                "State turnout declines".to_string(),
                json!(state_change_js(&rows)),
            ))
        }
        14 => {
            let year = args.year.unwrap_or(later);
            let rows = questions::closest_contests(ds, year, n)?;
            let mut table =
                Table::new(&["constituency", "state", "candidate", "party", "margin"]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.state.clone(),
                    r.candidate.clone(),
                    r.party.clone(),
                    r.margin.to_string(),
                ]);
            }
            table.print(&format!("[14] Closest contests ({})", year));
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "state": r.state,
                        "candidate": r.candidate,
                        "party": r.party,
                        "margin": r.margin
                    })
                })
                .collect();
            Ok((format!("Closest contests ({})", year), json!(data)))
        }
        15 => {
            let rows = questions::vote_share_shifts(ds, 20)?;
            let mut table = Table::new(&[
                "constituency",
                "party",
                "earlier share %",
                "later share %",
                "change",
            ]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.party.clone(),
                    fmt_f64(r.earlier_share),
                    fmt_f64(r.later_share),
                    fmt_f64(r.change),
                ]);
            }
            table.print("[15] Largest vote-share shifts");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "party": r.party,
                        "earlierShare": r.earlier_share,
                        "laterShare": r.later_share,
                        "change": r.change
                    })
                })
                .collect();
            Ok(("Vote share shifts".to_string(), json!(data)))
        }
        16 => {
            let years = [earlier, later];
            let data = question_variants(16, &years, |&year| {
                let res = questions::low_share_party_winners(ds, year, args.threshold)?;
                low_share_tables(&res, 16, year);
                let mut js = low_share_js(&res);
                js["year"] = json!(year);
                Ok(js)
            })?;
            Ok((
                "Winners from small parties, both cycles".to_string(),
                data,
            ))
        }
        17 => {
            let res = questions::nota_distribution(ds, 20)?;
            let mut by_state = Table::new(&["state", "year", "votes"]);
            for r in &res.by_state {
                by_state.row(vec![
                    r.state.clone(),
                    r.year.to_string(),
                    r.votes.to_string(),
                ]);
            }
            by_state.print("[17] NOTA votes by state and cycle");
            let mut by_pc = Table::new(&["constituency", "earlier votes", "later votes", "total"]);
            for r in &res.constituencies {
                by_pc.row(vec![
                    r.constituency.clone(),
                    r.earlier_votes.to_string(),
                    r.later_votes.to_string(),
                    r.total.to_string(),
                ]);
            }
            by_pc.print("[17] ... and by constituency");
            let by_state: Vec<JSValue> = res
                .by_state
                .iter()
                .map(|r| json!({ "state": r.state, "year": r.year, "votes": r.votes }))
                .collect();
            Ok((
                "NOTA distribution".to_string(),
                json!({ "byState": by_state, "constituencies": nota_js(&res.constituencies) }),
            ))
        }
        18 => {
            let rows = questions::party_constituency_gains(ds)?;
            let mut table = Table::new(&["party", "seats gained"]);
            for r in &rows {
                table.row(vec![r.party.clone(), r.gains.to_string()]);
            }
            table.print("[18] Parties by seats taken over");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| json!({ "party": r.party, "gains": r.gains }))
                .collect();
            Ok(("Party constituency gains".to_string(), json!(data)))
        }
        19 => {
            let res = questions::consistent_turnout_extremes(ds)?;
            for (rows, label) in [(&res.high, "high"), (&res.low, "low")] {
                let mut table = Table::new(&["constituency", "earlier %", "later %"]);
                for r in rows.iter() {
                    table.row(vec![
                        r.constituency.clone(),
                        fmt_f64(r.earlier_pct),
                        fmt_f64(r.later_pct),
                    ]);
                }
                table.print(&format!("[19] Consistently {}-turnout constituencies", label));
            }
            let js = |rows: &[questions::ConsistentTurnoutRow]| -> Vec<JSValue> {
                rows.iter()
                    .map(|r| {
                        json!({
                            "constituency": r.constituency,
                            "earlierPct": r.earlier_pct,
                            "laterPct": r.later_pct
                        })
                    })
                    .collect()
            };
            Ok((
                "Consistent turnout extremes".to_string(),
                json!({ "high": js(&res.high), "low": js(&res.low) }),
            ))
        }
        20 => {
            let rows = questions::age_group_vote_changes(ds)?;
            let mut table =
                Table::new(&["age group", "earlier votes", "later votes", "change"]);
            for r in &rows {
                table.row(vec![
                    r.age_group.to_string(),
                    r.earlier_votes.to_string(),
                    r.later_votes.to_string(),
                    r.change.to_string(),
                ]);
            }
            table.print("[20] General votes by candidate age group");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "ageGroup": r.age_group,
                        "earlierVotes": r.earlier_votes,
                        "laterVotes": r.later_votes,
                        "change": r.change
                    })
                })
                .collect();
            Ok(("Age group vote changes".to_string(), json!(data)))
        }
        21 => {
            let rows = questions::youth_turnout_shifts(ds, 20)?;
            let mut table = Table::new(&[
                "constituency",
                "state",
                "winner party",
                "earlier %",
                "later %",
                "change",
            ]);
            for r in &rows {
                table.row(vec![
                    r.constituency.clone(),
                    r.state.clone(),
                    r.winner_party.clone().unwrap_or_else(|| "-".to_string()),
                    fmt_f64(r.earlier_pct),
                    fmt_f64(r.later_pct),
                    fmt_f64(r.change),
                ]);
            }
            table.print("[21] Biggest youth-vote increases");
            let data: Vec<JSValue> = rows
                .iter()
                .map(|r| {
                    json!({
                        "constituency": r.constituency,
                        "state": r.state,
                        "winnerParty": r.winner_party,
                        "earlierPct": r.earlier_pct,
                        "laterPct": r.later_pct,
                        "change": r.change
                    })
                })
                .collect();
            Ok(("Youth turnout shifts".to_string(), json!(data)))
        }
        // question_ids only lets 1..=21 through
        _ => unreachable!("question id out of range: {}", id),
    }
}

// **** The explorer views ****

fn run_view<F>(name: &str, f: F) -> JSValue
where
    F: FnOnce() -> Result<JSValue, AnalyticsError>,
{
    match f() {
        Ok(data) => json!({ "view": name, "data": data }),
        Err(e) => {
            warn!("view {}: {}", name, e);
            println!("\n[{}] not available: {}", name, e);
            json!({ "view": name, "note": e.to_string() })
        }
    }
}

fn run_explore(args: &Args, ds: &Dataset) -> DashResult<Vec<JSValue>> {
    let sel = filters::selection_from_args(args)?;
    let mut sections: Vec<JSValue> = Vec::new();

    sections.push(run_view("votes_by_state", || {
        let rows = explore::votes_by_state(ds, &sel)?;
        let mut table = Table::new(&["state", "votes"]);
        for r in &rows {
            table.row(vec![r.state.clone(), r.votes.to_string()]);
        }
        table.print("Votes by state");
        Ok(json!(rows
            .iter()
            .map(|r| json!({ "state": r.state, "votes": r.votes }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("party_totals", || {
        let rows = explore::party_totals(ds, &sel)?;
        let mut table = Table::new(&["party", "votes"]);
        for r in &rows {
            table.row(vec![r.party.clone(), r.votes.to_string()]);
        }
        table.print("Votes by party");
        Ok(json!(rows
            .iter()
            .map(|r| json!({ "party": r.party, "votes": r.votes }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("party_trend", || {
        let rows = explore::party_trend(ds, &sel)?;
        let mut table = Table::new(&["party", "year", "votes"]);
        for r in &rows {
            table.row(vec![
                r.party.clone(),
                r.year.to_string(),
                r.votes.to_string(),
            ]);
        }
        table.print("Party trend across cycles");
        Ok(json!(rows
            .iter()
            .map(|r| json!({ "party": r.party, "year": r.year, "votes": r.votes }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("state_party_breakdown", || {
        let rows = explore::state_party_breakdown(ds, &sel)?;
        let mut table = Table::new(&["state", "party", "votes"]);
        for r in &rows {
            table.row(vec![r.state.clone(), r.party.clone(), r.votes.to_string()]);
        }
        table.print("Votes by state and party");
        Ok(json!(rows
            .iter()
            .map(|r| json!({ "state": r.state, "party": r.party, "votes": r.votes }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("turnout_by_state", || {
        let rows = explore::turnout_by_state(ds, &sel)?;
        let mut table = Table::new(&["state", "year", "avg turnout %"]);
        for r in &rows {
            table.row(vec![
                r.state.clone(),
                r.year.to_string(),
                fmt_f64(r.avg_turnout_pct),
            ]);
        }
        table.print("Turnout by state and cycle");
        Ok(json!(rows
            .iter()
            .map(|r| json!({
                "state": r.state,
                "year": r.year,
                "avgTurnoutPct": r.avg_turnout_pct
            }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("top_candidates_by_state", || {
        let rows = explore::top_candidates_by_state(ds, &sel, 5)?;
        let mut table =
            Table::new(&["state", "year", "constituency", "candidate", "party", "votes"]);
        for r in &rows {
            table.row(vec![
                r.state.clone(),
                r.year.to_string(),
                r.constituency.clone(),
                r.candidate.clone(),
                r.party.clone(),
                r.votes.to_string(),
            ]);
        }
        table.print("Top candidates per state");
        Ok(json!(rows
            .iter()
            .map(|r| json!({
                "state": r.state,
                "year": r.year,
                "constituency": r.constituency,
                "candidate": r.candidate,
                "party": r.party,
                "votes": r.votes
            }))
            .collect::<Vec<JSValue>>()))
    }));

    sections.push(run_view("turnout_change_summary", || {
        let res = explore::turnout_change_summary(ds, &sel)?;
        state_change_table(&res.rows, "Turnout change by state");
        println!(
            "best mover: {} ({:+.2}), worst: {} ({:+.2}), average change: {:+.2}",
            res.top.state, res.top.change, res.bottom.state, res.bottom.change, res.average_change
        );
        Ok(json!({
            "rows": state_change_js(&res.rows),
            "top": state_change_js(std::slice::from_ref(&res.top)),
            "bottom": state_change_js(std::slice::from_ref(&res.bottom)),
            "averageChange": res.average_change
        }))
    }));

    if let Some(path) = &args.geojson {
        sections.push(region_coverage(ds, &sel, path));
    }
    Ok(sections)
}

/// Reports which states of the selection can be drawn on the given map.
/// A broken or unreadable map degrades this one section, not the run.
fn region_coverage(ds: &Dataset, sel: &FilterSelection, path: &str) -> JSValue {
    let states = if sel.states.is_empty() {
        explore::state_options(ds)
    } else {
        sel.states.clone()
    };
    match geo::region_names(path) {
        Ok(regions) => {
            let join = explore::match_states_to_regions(&states, &regions);
            let mut table = Table::new(&["state", "map region"]);
            for (state, region) in &join.matched {
                table.row(vec![state.clone(), region.clone()]);
            }
            table.print("Map region coverage");
            if !join.unmatched.is_empty() {
                warn!("states without a map region: {:?}", join.unmatched);
                println!("not on the map: {}", join.unmatched.join(", "));
            }
            json!({
                "view": "region_coverage",
                "data": {
                    "matched": join.matched.iter()
                        .map(|(state, region)| json!({ "state": state, "region": region }))
                        .collect::<Vec<JSValue>>(),
                    "unmatched": join.unmatched
                }
            })
        }
        Err(e) => {
            warn!("map file {}: {}", path, e);
            println!("\n[region_coverage] not available: {}", e);
            json!({ "view": "region_coverage", "note": e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use election_analytics::{DatasetBuilder, RawRecord};

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["lokdash"];
        full.extend_from_slice(argv);
        Args::parse_from(full)
    }

    fn build_fixture(rows: &[(&str, &str, u16, &str, &str, u64)]) -> Dataset {
        let mut builder = DatasetBuilder::new();
        for (pc, state, year, party, candidate, votes) in rows {
            builder.add_record(RawRecord {
                constituency: pc.to_string(),
                state: state.to_string(),
                year: *year,
                party: party.to_string(),
                candidate: candidate.to_string(),
                total_votes: *votes,
                total_electors: 100_000,
                ..RawRecord::default()
            });
        }
        builder.build().unwrap()
    }

    fn fixture() -> Dataset {
        build_fixture(&[
            ("X", "S1", 2014, "A", "a1", 60_000),
            ("X", "S1", 2014, "B", "b1", 40_000),
            ("Y", "S2", 2014, "C", "c1", 30_000),
            ("X", "S1", 2019, "B", "b1", 55_000),
            ("Y", "S2", 2019, "C", "c1", 40_000),
        ])
    }

    /// Party W takes seat Y in 2014 and party Z takes it in 2019, each
    /// while holding ~5% of the state's votes.
    fn small_party_fixture() -> Dataset {
        build_fixture(&[
            ("X", "S", 2014, "A", "a1", 90_000),
            ("Y", "S", 2014, "A", "a2", 4_000),
            ("Y", "S", 2014, "W", "w1", 5_000),
            ("X", "S", 2019, "A", "a1", 90_000),
            ("Y", "S", 2019, "A", "a2", 4_000),
            ("Y", "S", 2019, "Z", "z1", 5_000),
        ])
    }

    /// Like [`small_party_fixture`], but the 2014 seat stays with the big
    /// party: the only small-party win happens in 2019.
    fn later_only_small_party_fixture() -> Dataset {
        build_fixture(&[
            ("X", "S", 2014, "A", "a1", 90_000),
            ("Y", "S", 2014, "A", "a2", 9_000),
            ("X", "S", 2019, "A", "a1", 90_000),
            ("Y", "S", 2019, "A", "a2", 4_000),
            ("Y", "S", 2019, "Z", "z1", 5_000),
        ])
    }

    #[test]
    fn question_selection_is_validated() {
        assert_eq!(question_ids(&args(&["--question", "all"])).unwrap().len(), 21);
        assert_eq!(question_ids(&args(&["--question", "4"])).unwrap(), vec![4]);
        assert!(question_ids(&args(&["--question", "22"])).is_err());
        assert!(question_ids(&args(&["--question", "four"])).is_err());
    }

    #[test]
    fn failing_question_degrades_to_a_note() {
        let ds = fixture();
        // Question 14 needs the general-votes column, which the fixture lacks.
        let sections = run_questions(&args(&["--question", "14"]), &ds).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0]["question"], 14);
        assert!(sections[0]["note"].as_str().unwrap().contains("general_votes"));
    }

    #[test]
    fn successful_question_carries_its_rows() {
        let ds = fixture();
        let sections = run_questions(&args(&["--question", "4"]), &ds).unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["constituency"], "X");
        assert_eq!(data[0]["earlierParty"], "A");
        assert_eq!(data[0]["laterParty"], "B");
    }

    #[test]
    fn question_11_reports_later_cycle_small_party_wins() {
        // The only small-party win is in 2019; it must be reported, not
        // degraded to an empty-result note.
        let ds = later_only_small_party_fixture();
        let sections = run_questions(&args(&["--question", "11"]), &ds).unwrap();
        assert!(sections[0].get("note").is_none());
        assert_eq!(
            sections[0]["title"].as_str().unwrap(),
            "Winners from small parties (2019)"
        );
        let winners = sections[0]["data"]["winners"].as_array().unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0]["party"], "Z");
        assert_eq!(winners[0]["constituency"], "Y");
    }

    #[test]
    fn question_16_covers_both_cycles() {
        let ds = small_party_fixture();
        let sections = run_questions(&args(&["--question", "16"]), &ds).unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["year"], 2014);
        assert_eq!(data[0]["winners"][0]["party"], "W");
        assert_eq!(data[1]["year"], 2019);
        assert_eq!(data[1]["winners"][0]["party"], "Z");

        // A cycle without small-party wins drops out instead of failing
        // the question.
        let ds = later_only_small_party_fixture();
        let sections = run_questions(&args(&["--question", "16"]), &ds).unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["year"], 2019);
    }

    #[test]
    fn turnout_questions_default_to_both_cycles() {
        let ds = fixture();
        let sections = run_questions(&args(&["--question", "1"]), &ds).unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["year"], 2014);
        assert_eq!(data[1]["year"], 2019);

        let sections = run_questions(&args(&["--question", "2", "--year", "2019"]), &ds).unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["year"], 2019);
    }

    #[test]
    fn gains_and_losses_run_once_per_party() {
        assert_eq!(args(&[]).party, vec!["BJP", "INC"]);

        let ds = fixture();
        let sections = run_questions(
            &args(&["--question", "8", "--party", "B", "--party", "C"]),
            &ds,
        )
        .unwrap();
        let data = sections[0]["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["party"], "B");
        assert_eq!(data[1]["party"], "C");

        // Parties absent from the data degrade the question to a note.
        let sections = run_questions(&args(&["--question", "9"]), &ds).unwrap();
        assert!(sections[0]["note"].as_str().is_some());
    }

    #[test]
    fn explorer_sections_cover_all_views() {
        let ds = fixture();
        let sections = run_explore(&args(&["--explore"]), &ds).unwrap();
        let names: Vec<&str> = sections
            .iter()
            .map(|s| s["view"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "votes_by_state",
                "party_totals",
                "party_trend",
                "state_party_breakdown",
                "turnout_by_state",
                "top_candidates_by_state",
                "turnout_change_summary"
            ]
        );
        assert!(sections.iter().all(|s| s.get("note").is_none()));
    }

    #[test]
    fn dataset_meta_serializes_with_camel_case_keys() {
        let meta = DatasetMeta {
            records: 5,
            earlier_year: 2014,
            later_year: 2019,
            has_age: false,
            has_general_votes: true,
        };
        let js = serde_json::to_value(&meta).unwrap();
        assert_eq!(js["earlierYear"], 2014);
        assert_eq!(js["hasGeneralVotes"], true);
    }
}
