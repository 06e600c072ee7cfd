/*!

# Quick start

This example walks through loading a two-cycle results file and running a
couple of pipelines on it. The library itself never touches the filesystem;
it expects the caller (for instance the `lokdash` command line tool) to
parse its CSV input and hand over plain records.

**Building the table** Records are pushed one by one into a
[`DatasetBuilder`](crate::DatasetBuilder). Each record is one candidate's
result in one constituency for one cycle; the elector roll is repeated on
every candidate row of a constituency. The builder derives the turnout
column and checks that exactly two election cycles are present:

```
use election_analytics::{DatasetBuilder, RawRecord};

let mut builder = DatasetBuilder::new();
for (year, party, candidate, votes) in [
    (2014u16, "A", "Asha", 60_000u64),
    (2014, "B", "Bina", 40_000),
    (2019, "A", "Asha", 45_000),
    (2019, "B", "Badal", 55_000),
] {
    builder.add_record(RawRecord {
        constituency: "Adilabad".to_string(),
        state: "Telangana".to_string(),
        year,
        party: party.to_string(),
        candidate: candidate.to_string(),
        total_votes: votes,
        total_electors: 100_000,
        ..RawRecord::default()
    });
}
let dataset = builder.build()?;
assert_eq!(dataset.years(), (2014, 2019));
# Ok::<(), election_analytics::AnalyticsError>(())
```

**Running a canned question** Every question is a pure function of the
table. Here the seat above flips from party A to party B, so it shows up
in [`questions::flipped_seats`](crate::questions::flipped_seats):

```
# use election_analytics::{DatasetBuilder, RawRecord};
use election_analytics::questions;

# let mut builder = DatasetBuilder::new();
# for (year, party, candidate, votes) in [
#     (2014u16, "A", "Asha", 60_000u64),
#     (2014, "B", "Bina", 40_000),
#     (2019, "A", "Asha", 45_000),
#     (2019, "B", "Badal", 55_000),
# ] {
#     builder.add_record(RawRecord {
#         constituency: "Adilabad".to_string(),
#         state: "Telangana".to_string(),
#         year,
#         party: party.to_string(),
#         candidate: candidate.to_string(),
#         total_votes: votes,
#         total_electors: 100_000,
#         ..RawRecord::default()
#     });
# }
# let dataset = builder.build()?;
let flipped = questions::flipped_seats(&dataset, 10)?;
assert_eq!(flipped[0].earlier_party, "A");
assert_eq!(flipped[0].later_party, "B");
# Ok::<(), election_analytics::AnalyticsError>(())
```

**Exploring with filters** The [`explore`](crate::explore) module takes a
[`FilterSelection`](crate::FilterSelection) instead of fixed parameters.
An empty list on an axis means no restriction, so the default selection
covers the whole table:

```
# use election_analytics::{DatasetBuilder, RawRecord};
use election_analytics::{explore, FilterSelection};

# let mut builder = DatasetBuilder::new();
# for year in [2014u16, 2019] {
#     builder.add_record(RawRecord {
#         constituency: "Adilabad".to_string(),
#         state: "Telangana".to_string(),
#         year,
#         party: "A".to_string(),
#         candidate: "Asha".to_string(),
#         total_votes: 60_000,
#         total_electors: 100_000,
#         ..RawRecord::default()
#     });
# }
# let dataset = builder.build()?;
let selection = FilterSelection {
    years: vec![2019],
    ..FilterSelection::default()
};
let by_state = explore::votes_by_state(&dataset, &selection)?;
assert_eq!(by_state[0].state, "Telangana");
# Ok::<(), election_analytics::AnalyticsError>(())
```

Pipelines that end up with nothing to aggregate return
[`AnalyticsError::NoMatchingRows`](crate::AnalyticsError) rather than an
empty table; callers are expected to turn this into a notice for the one
affected view and keep going.

*/
