//! CSV readers for the two supported input shapes: one combined file with a
//! year column, or one file per cycle with the year injected from the
//! command line.

use log::{debug, info};
use snafu::prelude::*;

use election_analytics::{Dataset, DatasetBuilder, RawRecord};

use crate::dash::{BuildingDatasetSnafu, DashResult, MissingInputColumnSnafu, ReadingCsvSnafu};

/// Accepted header spellings per logical column. Matching is
/// case-insensitive and ignores surrounding whitespace.
const CONSTITUENCY: &[&str] = &["pc_name", "constituency"];
const STATE: &[&str] = &["state", "state_name"];
const YEAR: &[&str] = &["year"];
const PARTY: &[&str] = &["party", "partyname"];
const CANDIDATE: &[&str] = &["candidate", "candidate_name"];
const TOTAL_VOTES: &[&str] = &["total_votes", "totvotpoll"];
const TOTAL_ELECTORS: &[&str] = &["total_electors", "electors"];
const GENERAL_VOTES: &[&str] = &["general_votes"];
const AGE: &[&str] = &["age"];

/// The 17 constituencies that moved from Andhra Pradesh to Telangana in
/// 2014; older result files still list them under the parent state.
const TELANGANA_SEATS: [&str; 17] = [
    "Adilabad",
    "Peddapalle",
    "Karimnagar",
    "Nizamabad",
    "Zahirabad",
    "Medak",
    "Malkajgiri",
    "Secundrabad",
    "Hyderabad",
    "Chelvella",
    "Mahbubnagar",
    "Nagarkurnool",
    "Nalgonda",
    "Bhongir",
    "Warangal",
    "Mahabubabad",
    "Khammam",
];

struct Columns {
    constituency: usize,
    state: usize,
    year: Option<usize>,
    party: usize,
    candidate: usize,
    total_votes: usize,
    total_electors: usize,
    general_votes: Option<usize>,
    age: Option<usize>,
}

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
}

fn require_column(
    headers: &csv::StringRecord,
    aliases: &[&str],
    path: &str,
) -> DashResult<usize> {
    find_column(headers, aliases).context(MissingInputColumnSnafu {
        name: aliases[0].to_string(),
        path: path.to_string(),
    })
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, path: &str) -> DashResult<Columns> {
        Ok(Columns {
            constituency: require_column(headers, CONSTITUENCY, path)?,
            state: require_column(headers, STATE, path)?,
            year: find_column(headers, YEAR),
            party: require_column(headers, PARTY, path)?,
            candidate: require_column(headers, CANDIDATE, path)?,
            total_votes: require_column(headers, TOTAL_VOTES, path)?,
            total_electors: require_column(headers, TOTAL_ELECTORS, path)?,
            general_votes: find_column(headers, GENERAL_VOTES),
            age: find_column(headers, AGE),
        })
    }
}

/// Lenient count parsing: the public result files mix integers, floats
/// ("123.0") and blanks in the same column. Anything unreadable is zero.
fn parse_count(cell: &str) -> u64 {
    let s = cell.trim();
    if let Ok(x) = s.parse::<u64>() {
        return x;
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() && x >= 0.0 => x.round() as u64,
        _ => 0,
    }
}

/// Optional counts keep the blank/unreadable distinction instead of
/// collapsing to zero.
fn parse_optional_count(cell: &str) -> Option<u64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(x) = s.parse::<u64>() {
        return Some(x);
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() && x >= 0.0 => Some(x.round() as u64),
        _ => None,
    }
}

fn read_records<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    path: &str,
    year_override: Option<u16>,
) -> DashResult<Vec<RawRecord>> {
    let headers = reader
        .headers()
        .context(ReadingCsvSnafu {
            path: path.to_string(),
        })?
        .clone();
    debug!("header: {:?}", headers);
    let cols = Columns::resolve(&headers, path)?;
    if cols.year.is_none() && year_override.is_none() {
        return MissingInputColumnSnafu {
            name: "year".to_string(),
            path: path.to_string(),
        }
        .fail();
    }

    let cell = |record: &csv::StringRecord, idx: usize| -> String {
        record.get(idx).unwrap_or("").trim().to_string()
    };
    let mut res: Vec<RawRecord> = Vec::new();
    for record in reader.records() {
        let record = record.context(ReadingCsvSnafu {
            path: path.to_string(),
        })?;
        let year = match cols.year {
            Some(idx) => match cell(&record, idx).parse::<u16>() {
                Ok(y) => y,
                // A row with an unreadable year cannot be assigned to a cycle.
                Err(_) => match year_override {
                    Some(y) => y,
                    None => continue,
                },
            },
            None => year_override.unwrap_or(0),
        };
        res.push(RawRecord {
            constituency: cell(&record, cols.constituency),
            state: cell(&record, cols.state),
            year,
            party: cell(&record, cols.party),
            candidate: cell(&record, cols.candidate),
            total_votes: parse_count(&cell(&record, cols.total_votes)),
            total_electors: parse_count(&cell(&record, cols.total_electors)),
            general_votes: cols
                .general_votes
                .and_then(|idx| parse_optional_count(&cell(&record, idx))),
            age: cols
                .age
                .and_then(|idx| parse_optional_count(&cell(&record, idx)))
                .map(|a| a as u32),
        });
    }
    info!("read {} records from {}", res.len(), path);
    Ok(res)
}

fn read_file(path: &str, year_override: Option<u16>) -> DashResult<Vec<RawRecord>> {
    let reader = csv::Reader::from_path(path).context(ReadingCsvSnafu {
        path: path.to_string(),
    })?;
    read_records(reader, path, year_override)
}

/// Loads a combined file covering both cycles. The year column is required.
pub fn load_combined(path: &str) -> DashResult<Dataset> {
    let records = read_file(path, None)?;
    build(records)
}

/// Loads one file per cycle. The earlier file gets the Telangana seat
/// correction, since 2014-era files predate the state split.
pub fn load_pair(
    earlier_path: &str,
    later_path: &str,
    earlier_year: u16,
    later_year: u16,
) -> DashResult<Dataset> {
    let mut records = read_file(earlier_path, Some(earlier_year))?;
    for r in records.iter_mut() {
        fix_telangana(r);
    }
    records.extend(read_file(later_path, Some(later_year))?);
    build(records)
}

fn fix_telangana(r: &mut RawRecord) {
    if r.state == "Andhra Pradesh"
        && TELANGANA_SEATS
            .iter()
            .any(|seat| r.constituency.eq_ignore_ascii_case(seat))
    {
        r.state = "Telangana".to_string();
    }
}

fn build(records: Vec<RawRecord>) -> DashResult<Dataset> {
    let mut builder = DatasetBuilder::new();
    for r in records {
        builder.add_record(r);
    }
    builder.build().context(BuildingDatasetSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str, year_override: Option<u16>) -> Vec<RawRecord> {
        let reader = csv::Reader::from_reader(content.as_bytes());
        read_records(reader, "test.csv", year_override).unwrap()
    }

    #[test]
    fn header_aliases_are_accepted() {
        let content = "\
state_name,pc_name,year,party,candidate_name,totvotpoll,electors
Kerala,Wayanad,2019,INC,R. Gandhi,700000,1300000
";
        let recs = parse(content, None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].state, "Kerala");
        assert_eq!(recs[0].constituency, "Wayanad");
        assert_eq!(recs[0].total_votes, 700_000);
        assert_eq!(recs[0].total_electors, 1_300_000);
        assert_eq!(recs[0].general_votes, None);
        assert_eq!(recs[0].age, None);
    }

    #[test]
    fn counts_are_coerced_leniently() {
        let content = "\
state,pc_name,year,party,candidate,total_votes,total_electors,general_votes,age
Kerala,Wayanad,2019,INC,R. Gandhi,700000.0,junk,650000,49.0
Kerala,Wayanad,2019,BSP,P. Rahul,,100,,
";
        let recs = parse(content, None);
        assert_eq!(recs[0].total_votes, 700_000);
        assert_eq!(recs[0].total_electors, 0);
        assert_eq!(recs[0].general_votes, Some(650_000));
        assert_eq!(recs[0].age, Some(49));
        assert_eq!(recs[1].total_votes, 0);
        assert_eq!(recs[1].general_votes, None);
        assert_eq!(recs[1].age, None);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let content = "state,year,party,candidate,total_votes,total_electors\n";
        let reader = csv::Reader::from_reader(content.as_bytes());
        let err = read_records(reader, "test.csv", None).unwrap_err();
        assert!(err.to_string().contains("pc_name"));
    }

    #[test]
    fn year_is_injected_when_the_column_is_absent() {
        let content = "\
state,pc_name,party,candidate,total_votes,total_electors
Kerala,Wayanad,INC,R. Gandhi,700000,1300000
";
        let recs = parse(content, Some(2014));
        assert_eq!(recs[0].year, 2014);

        let reader = csv::Reader::from_reader(content.as_bytes());
        assert!(read_records(reader, "test.csv", None).is_err());
    }

    #[test]
    fn telangana_seats_are_reassigned() {
        let mut r = RawRecord {
            constituency: "Adilabad".to_string(),
            state: "Andhra Pradesh".to_string(),
            ..RawRecord::default()
        };
        fix_telangana(&mut r);
        assert_eq!(r.state, "Telangana");

        let mut r = RawRecord {
            constituency: "Guntur".to_string(),
            state: "Andhra Pradesh".to_string(),
            ..RawRecord::default()
        };
        fix_telangana(&mut r);
        assert_eq!(r.state, "Andhra Pradesh");
    }
}
