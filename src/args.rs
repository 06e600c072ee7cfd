use clap::Parser;

/// This is an analytical dashboard over two-cycle general election results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) A combined CSV file covering both election cycles. The file must carry a
    /// 'year' column. Mutually exclusive with --input-earlier/--input-later.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path) The earlier cycle's CSV file, when the cycles come in two separate files.
    /// Must be given together with --input-later.
    #[clap(long, value_parser)]
    pub input_earlier: Option<String>,

    /// (file path) The later cycle's CSV file. Must be given together with --input-earlier.
    #[clap(long, value_parser)]
    pub input_later: Option<String>,

    /// The year label of the earlier cycle, used when its file has no 'year' column.
    #[clap(long, value_parser, default_value_t = 2014)]
    pub earlier_year: u16,

    /// The year label of the later cycle, used when its file has no 'year' column.
    #[clap(long, value_parser, default_value_t = 2019)]
    pub later_year: u16,

    /// Which question of the menu to run: a number from 1 to 21, or 'all'.
    #[clap(short, long, value_parser, default_value = "all")]
    pub question: String,

    /// The number of rows shown by the ranked questions.
    #[clap(long, value_parser, default_value_t = 10)]
    pub top: usize,

    /// The election cycle used by the single-cycle questions (turnout extremes, closest
    /// contests). Defaults to the cycle each question is usually asked about.
    #[clap(long, value_parser)]
    pub year: Option<u16>,

    /// The state used by the state-level questions.
    #[clap(long, value_parser, default_value = "Uttar Pradesh")]
    pub state: String,

    /// The parties used by the gains/losses questions, one result section per
    /// party. May be repeated.
    #[clap(long, value_parser, default_values = &["BJP", "INC"])]
    pub party: Vec<String>,

    /// (%) The state-share cutoff below which a winning party counts as small.
    #[clap(long, value_parser, default_value_t = 10.0)]
    pub threshold: f64,

    /// If passed as an argument, runs the filter-driven explorer views instead of the
    /// question menu. The filters below apply only in this mode.
    #[clap(long, takes_value = false)]
    pub explore: bool,

    /// (explorer) Restricts the views to these election years. May be repeated.
    #[clap(long, value_parser)]
    pub years: Vec<u16>,

    /// (explorer) Restricts the views to the states of these zones (northern, southern,
    /// eastern, western, central, north-eastern). May be repeated.
    #[clap(long, value_parser)]
    pub zones: Vec<String>,

    /// (explorer) Restricts the views to these states. May be repeated and combined
    /// with --zones.
    #[clap(long, value_parser)]
    pub states: Vec<String>,

    /// (explorer) Restricts the views to these constituencies. May be repeated.
    #[clap(long, value_parser)]
    pub constituencies: Vec<String>,

    /// (explorer) Restricts the views to these parties. May be repeated.
    #[clap(long, value_parser)]
    pub parties: Vec<String>,

    /// (file path) A GeoJSON file with state boundaries. When given, the explorer reports
    /// which states of the data could be joined onto the map's region labels.
    #[clap(long, value_parser)]
    pub geojson: Option<String>,

    /// (file path or 'stdout') If specified, a summary of the computed results will be
    /// written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, lokdash will check
    /// that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
