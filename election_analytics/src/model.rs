// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One row of the base table: a single candidate's result in one
/// constituency for one election cycle.
///
/// Multiple records share a (constituency, year) pair, one per candidate.
/// `total_electors` is the elector roll of the whole constituency and is
/// repeated on every candidate row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub constituency: String,
    pub state: String,
    pub year: u16,
    pub party: String,
    pub candidate: String,
    pub total_votes: u64,
    pub total_electors: u64,
    /// Votes cast in the general category, when the source provides them.
    pub general_votes: Option<u64>,
    /// Candidate age, when the source provides it.
    pub age: Option<u32>,
    /// total_votes / total_electors * 100, zero when the roll is zero.
    pub turnout_pct: f64,
}

/// The immutable base table, loaded once per session.
///
/// Build one with [`crate::DatasetBuilder`]. Every pipeline re-derives its
/// result from these records on each call; nothing is cached or mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub(crate) records: Vec<Record>,
    /// The two election cycles present in the data, in increasing order.
    pub(crate) years: (u16, u16),
    pub(crate) has_age: bool,
    pub(crate) has_general_votes: bool,
}

impl Dataset {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The (earlier, later) election cycles covered by the table.
    pub fn years(&self) -> (u16, u16) {
        self.years
    }

    /// Iterates over the records of a single cycle.
    pub fn cycle(&self, year: u16) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter().filter(move |r| r.year == year)
    }

    /// Whether any record carries a candidate age.
    pub fn has_age(&self) -> bool {
        self.has_age
    }

    /// Whether any record carries a general-category vote count.
    pub fn has_general_votes(&self) -> bool {
        self.has_general_votes
    }

    pub(crate) fn check_year(&self, year: u16) -> Result<(), AnalyticsError> {
        if year == self.years.0 || year == self.years.1 {
            Ok(())
        } else {
            Err(AnalyticsError::UnknownYear(year))
        }
    }
}

/// A resolved selection for the filter-driven explorer views.
///
/// The selection is immutable and passed by reference into each pipeline;
/// how the values were chosen (zones, select-all boxes, ...) is the front
/// end's business. An empty list means no restriction on that axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub years: Vec<u16>,
    pub states: Vec<String>,
    pub constituencies: Vec<String>,
    pub parties: Vec<String>,
}

impl FilterSelection {
    pub(crate) fn accepts(&self, r: &Record) -> bool {
        (self.years.is_empty() || self.years.contains(&r.year))
            && (self.states.is_empty() || self.states.iter().any(|s| s == &r.state))
            && (self.constituencies.is_empty()
                || self.constituencies.iter().any(|c| c == &r.constituency))
            && (self.parties.is_empty() || self.parties.iter().any(|p| p == &r.party))
    }
}

// ******** Errors *********

/// Optional columns a pipeline may depend on.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Column {
    Age,
    GeneralVotes,
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Column::Age => write!(f, "age"),
            Column::GeneralVotes => write!(f, "general_votes"),
        }
    }
}

/// Errors that prevent a pipeline from producing a result.
///
/// These are recoverable by design: the caller is expected to surface a
/// notice for the one affected view and keep the rest of the menu working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// The table has no records at all.
    EmptyDataset,
    /// The table does not cover exactly two election cycles.
    WrongCycleCount(usize),
    /// A year parameter is not one of the two known cycles.
    UnknownYear(u16),
    /// A pipeline depends on a column the loaded table does not carry.
    MissingColumn(Column),
    /// The filters or joins left zero records to aggregate.
    NoMatchingRows,
}

impl Error for AnalyticsError {}

impl Display for AnalyticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyticsError::EmptyDataset => write!(f, "the dataset contains no records"),
            AnalyticsError::WrongCycleCount(n) => {
                write!(f, "expected exactly two election cycles, found {}", n)
            }
            AnalyticsError::UnknownYear(y) => {
                write!(f, "year {} is not one of the dataset's election cycles", y)
            }
            AnalyticsError::MissingColumn(c) => {
                write!(f, "the dataset does not carry the '{}' column", c)
            }
            AnalyticsError::NoMatchingRows => {
                write!(f, "no rows match the given constraints")
            }
        }
    }
}
