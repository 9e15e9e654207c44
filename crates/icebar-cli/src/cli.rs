// CLI argument definitions (clap derive structs).

use clap::{Args, Parser, Subcommand};
use icebar_ir::space::SearchStrategy;
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Counterexample-guided repair of declarative models.\n\n\
    The search alternates a repair oracle, which synthesizes a fix against a\n\
    set of property tests, and a verification oracle, which checks candidate\n\
    fixes against the full property oracle and supplies counterexample tests\n\
    when a fix is spurious.\n\n\
    Typical run:\n  \
    icebar repair models/bank.als oracles/bank_oracle.als --laps 4\n\n\
    Oracle programs come from --repair-cmd / --verify-cmd, the config file,\n\
    or the ICEBAR_REPAIR_CMD / ICEBAR_VERIFY_CMD environment variables.\n\
    Command lines follow shell quoting, e.g. \"'/opt/My Tools/synth' -v\".";

#[derive(Parser)]
#[command(name = "icebar")]
#[command(about = "Counterexample-guided repair search for declarative models")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON configuration file; command-line flags override its values
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Directory for oracle working files (tests file, merged model, fixes)
    #[arg(long, global = true)]
    pub(crate) work_dir: Option<PathBuf>,

    /// Verification oracle command line, e.g. "java -jar checker.jar"
    #[arg(long, global = true)]
    pub(crate) verify_cmd: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Search for a repair of a faulty model
    Repair {
        /// Path to the faulty model
        model: PathBuf,

        /// Path to the property oracle the repair must satisfy
        oracle: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Repair oracle command line, e.g. "java -jar synthesizer.jar"
        #[arg(long)]
        repair_cmd: Option<String>,

        /// JSON array of initial tests seeding the search
        #[arg(long)]
        initial_tests: Option<PathBuf>,

        /// Append the one-line report to this file
        #[arg(long)]
        report_out: Option<PathBuf>,

        /// Write the full report as JSON to this file
        #[arg(long)]
        json_report: Option<PathBuf>,
    },

    /// Run the verification oracle once against a model and print the verdict
    Check {
        /// Path to the model
        model: PathBuf,

        /// Path to the property oracle
        oracle: PathBuf,
    },
}

/// Search flags. Every flag is optional so that unset flags leave the
/// configuration file's value in place.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct SearchArgs {
    /// Depth bound of the search tree (0 = single repair attempt)
    #[arg(long)]
    pub(crate) laps: Option<usize>,

    /// Wall-clock budget in seconds (0 disables the timeout)
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,

    /// Exploration order: dfs | bfs
    #[arg(long)]
    pub(crate) strategy: Option<SearchStrategy>,

    /// Explore candidates with more passing properties first
    #[arg(long)]
    pub(crate) prioritize: bool,

    /// Keep trusted counterexamples local to each lineage
    #[arg(long)]
    pub(crate) local_trusted: bool,

    /// Do not filter tests already introduced by an ancestor
    #[arg(long)]
    pub(crate) no_dedup: bool,

    /// Accept partial repairs as fixes to verify
    #[arg(long)]
    pub(crate) partial_as_fix: bool,

    /// Abort on tolerated repair-oracle crashes instead of skipping the candidate
    #[arg(long)]
    pub(crate) no_keep_going: bool,

    /// Regenerate tests with relaxed facts when a failed check yields none
    #[arg(long)]
    pub(crate) relaxed_facts: bool,

    /// Regenerate forcing assertion-derived tests when a failed check yields none
    #[arg(long)]
    pub(crate) force_assertion_tests: bool,

    /// Ask the verification oracle for instance tests as well
    #[arg(long)]
    pub(crate) instance_tests: bool,
}
