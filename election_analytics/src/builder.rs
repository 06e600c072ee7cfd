use crate::model::*;

/// A record as it comes out of a reader, before the derived columns exist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub constituency: String,
    pub state: String,
    pub year: u16,
    pub party: String,
    pub candidate: String,
    pub total_votes: u64,
    pub total_electors: u64,
    pub general_votes: Option<u64>,
    pub age: Option<u32>,
}

/// A builder for assembling the immutable base table.
///
/// ```
/// use election_analytics::{DatasetBuilder, RawRecord};
///
/// let mut builder = DatasetBuilder::new();
/// for year in [2014u16, 2019] {
///     builder.add_record(RawRecord {
///         constituency: "Adilabad".to_string(),
///         state: "Telangana".to_string(),
///         year,
///         party: "BJP".to_string(),
///         candidate: "A. Candidate".to_string(),
///         total_votes: 400_000,
///         total_electors: 1_000_000,
///         ..RawRecord::default()
///     });
/// }
/// let dataset = builder.build()?;
/// assert_eq!(dataset.years(), (2014, 2019));
/// # Ok::<(), election_analytics::AnalyticsError>(())
/// ```
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    records: Vec<Record>,
}

impl DatasetBuilder {
    pub fn new() -> DatasetBuilder {
        DatasetBuilder {
            records: Vec::new(),
        }
    }

    /// Adds one candidate row. The turnout column is derived here; a zero
    /// elector roll yields a turnout of zero rather than an error.
    pub fn add_record(&mut self, raw: RawRecord) {
        let turnout_pct = crate::pct(raw.total_votes as f64, raw.total_electors as f64);
        self.records.push(Record {
            constituency: raw.constituency,
            state: raw.state,
            year: raw.year,
            party: raw.party,
            candidate: raw.candidate,
            total_votes: raw.total_votes,
            total_electors: raw.total_electors,
            general_votes: raw.general_votes,
            age: raw.age,
            turnout_pct,
        });
    }

    /// Freezes the table. The data must cover exactly two election cycles.
    pub fn build(self) -> Result<Dataset, AnalyticsError> {
        if self.records.is_empty() {
            return Err(AnalyticsError::EmptyDataset);
        }
        let mut years: Vec<u16> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        if years.len() != 2 {
            return Err(AnalyticsError::WrongCycleCount(years.len()));
        }
        let has_age = self.records.iter().any(|r| r.age.is_some());
        let has_general_votes = self.records.iter().any(|r| r.general_votes.is_some());
        Ok(Dataset {
            records: self.records,
            years: (years[0], years[1]),
            has_age,
            has_general_votes,
        })
    }
}
