use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use enclose::{Config, DEFAULT_IGNORE, Lang, SearchMode};

/// enclose — find lines in source files and the branches that lead to them.
/// Prints each match together with the if/else, try and def/class headers
/// it sits under.
#[derive(Parser)]
#[command(
    name = "enclose",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ENCLOSE_BUILD_COMMIT"), ")"),
    about,
    group(clap::ArgGroup::new("mode").args(["search_line", "search_regex", "search_defs"]))
)]
struct Cli {
    /// Name or value to look for (a line number with -n, a pattern with -e).
    #[arg(required_unless_present = "completions")]
    look_for: Option<String>,

    /// Files to look in (or directories with -r).
    #[arg(required_unless_present = "completions", num_args = 1..)]
    paths: Vec<PathBuf>,

    /// Recursively search directories.
    #[arg(short, long)]
    recursive: bool,

    /// Search by line number: "12", "4,9" or "20-24".
    #[arg(short = 'n', long)]
    search_line: bool,

    /// Search by regular expression.
    #[arg(short = 'e', long)]
    search_regex: bool,

    /// Only list top-level class and function definitions.
    #[arg(short = 'd', long)]
    search_defs: bool,

    /// Comma-separated files, directories or globs to skip, on top of the defaults.
    #[arg(short, long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Language to parse as (name or extension). Detected from the file name by default.
    #[arg(short, long)]
    lang: Option<String>,

    /// Report files skipped because of errors.
    #[arg(short, long)]
    verbose: bool,

    /// Colorize line numbers and matches.
    #[arg(long, value_enum, default_value_t = Color::Auto)]
    color: Color,

    /// Machine-readable JSON output: file → context line numbers.
    #[arg(long)]
    json: bool,

    /// Print shell completions for the given shell.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    Auto,
    Always,
    Never,
}

impl Cli {
    fn mode(&self) -> SearchMode {
        if self.search_line {
            SearchMode::Line
        } else if self.search_regex {
            SearchMode::Regex
        } else if self.search_defs {
            SearchMode::Definitions
        } else {
            SearchMode::Value
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Shell completions
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "enclose", &mut io::stdout());
        return;
    }

    init_logging();

    let Some(look_for) = cli.look_for.as_deref() else {
        eprintln!("usage: enclose [OPTIONS] <LOOK_FOR> <PATHS>...");
        process::exit(2);
    };

    let lang = match cli.lang.as_deref().map(Lang::from_name).transpose() {
        Ok(lang) => lang,
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    };

    let config = Config {
        mode: cli.mode(),
        recursive: cli.recursive,
        ignore: DEFAULT_IGNORE
            .iter()
            .map(ToString::to_string)
            .chain(cli.ignore.iter().filter(|p| !p.is_empty()).cloned())
            .collect(),
        lang,
    };

    let report = match enclose::run(look_for, &cli.paths, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    };

    if cli.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("json error: {e}");
                process::exit(1);
            }
        }
    } else {
        let color = match cli.color {
            Color::Always => true,
            Color::Never => false,
            Color::Auto => io::stdout().is_terminal(),
        };
        print!("{}", report.render(color));
    }

    if cli.verbose
        && let Some(summary) = report.skipped_summary()
    {
        println!("{summary}");
    }
}

/// Diagnostics go to stderr, filtered by `ENCLOSE_LOG` (default: warnings only).
fn init_logging() {
    let filter = EnvFilter::try_from_env("ENCLOSE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
