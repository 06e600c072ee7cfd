//! Turns the explorer's command-line filters into a resolved selection.
//!
//! A zone is just shorthand for its member states. The memberships follow
//! the groupings election results are usually browsed by (Rajasthan sits
//! in the west, Uttar Pradesh in the north, the centre is only Madhya
//! Pradesh and Chhattisgarh), with names spelled the way the result files
//! spell them.

use log::debug;
use snafu::whatever;

use election_analytics::FilterSelection;

use crate::args::Args;
use crate::dash::DashResult;

const ZONES: [(&str, &[&str]); 6] = [
    (
        "northern",
        &[
            "Jammu and Kashmir",
            "Ladakh",
            "Himachal Pradesh",
            "Punjab",
            "Haryana",
            "Uttarakhand",
            "Uttar Pradesh",
            "Delhi",
            "Chandigarh",
        ],
    ),
    (
        "eastern",
        &["Bihar", "Jharkhand", "Odisha", "West Bengal"],
    ),
    (
        "western",
        &[
            "Rajasthan",
            "Gujarat",
            "Maharashtra",
            "Goa",
            "Dadra and Nagar Haveli",
            "Daman and Diu",
        ],
    ),
    (
        "southern",
        &[
            "Andhra Pradesh",
            "Karnataka",
            "Kerala",
            "Tamil Nadu",
            "Telangana",
            "Puducherry",
            "Andaman and Nicobar Islands",
            "Lakshadweep",
        ],
    ),
    ("central", &["Madhya Pradesh", "Chhattisgarh"]),
    (
        "north-eastern",
        &[
            "Assam",
            "Arunachal Pradesh",
            "Manipur",
            "Meghalaya",
            "Mizoram",
            "Nagaland",
            "Tripura",
            "Sikkim",
        ],
    ),
];

/// The member states of one zone. Zone names are case-insensitive.
pub fn zone_states(zone: &str) -> DashResult<Vec<String>> {
    match ZONES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone.trim()))
    {
        Some((_, states)) => Ok(states.iter().map(|s| s.to_string()).collect()),
        None => whatever!("Unknown zone {:?}", zone),
    }
}

/// Builds the explorer selection from the command line: zones expand to
/// their states and merge with the explicitly given ones.
pub fn selection_from_args(args: &Args) -> DashResult<FilterSelection> {
    let mut states = args.states.clone();
    for zone in &args.zones {
        for state in zone_states(zone)? {
            if !states.contains(&state) {
                states.push(state);
            }
        }
    }
    let selection = FilterSelection {
        years: args.years.clone(),
        states,
        constituencies: args.constituencies.clone(),
        parties: args.parties.clone(),
    };
    debug!("resolved selection: {:?}", selection);
    Ok(selection)
}
