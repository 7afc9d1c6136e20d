use clap::Parser;

/// Builds descriptive reports over Brazilian electoral open-data exports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with run settings. Values given on
    /// the command line take precedence over values found in the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default ./data) Root directory holding one sub-directory
    /// per dataset (candidatos, candidatos_bens, ...), each containing the
    /// semicolon-delimited export shards.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// (directory, default ./output) Directory the reports are written into.
    /// Created if missing.
    #[clap(short, long, value_parser)]
    pub out_dir: Option<String>,

    /// (directory) Directory with plain-text extracts of the government
    /// proposals. Defaults to <data-dir>/candidatos_propostas_governo/SC.
    #[clap(long, value_parser)]
    pub proposals_dir: Option<String>,

    /// (count) Number of concurrent workers used for both file parsing and
    /// report execution. Defaults to the host CPU count.
    #[clap(short, long, value_parser)]
    pub workers: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
