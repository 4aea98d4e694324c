use clap::{Parser, Subcommand};
use colored::Colorize;
use lexgen_core::{LexerBundle, LexgenError, TokenStream, generate, tokenize};
use log::LevelFilter;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Path argument meaning standard input
const STDIN: &str = "-";

#[derive(Parser)]
#[command(name = "lexgen")]
#[command(about = "Lexgen - A lexical analyzer generator")]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a definitions file into a lexer bundle
    Generate {
        /// The definitions file, or `-` for stdin
        definitions: PathBuf,
        /// Where to write the bundle
        #[arg(short, long, default_value = "lexer.json")]
        output: PathBuf,
    },
    /// Tokenize input with a previously generated bundle
    Analyze {
        /// The bundle written by `generate`
        bundle: PathBuf,
        /// The source to tokenize, stdin if omitted or `-`
        input: Option<PathBuf>,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Compile definitions in memory and tokenize input with them
    Run {
        /// The definitions file, or `-` for stdin
        definitions: PathBuf,
        /// The source to tokenize, stdin if omitted or `-`
        input: Option<PathBuf>,
        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Exit with an error if any character could not be matched
    #[arg(long)]
    strict: bool,
    /// Print token and error counts to stderr
    #[arg(long)]
    summary: bool,
}

/// Level requested with `-v`, or `None` to leave it to `RUST_LOG`
fn verbosity_level(verbose: u8) -> Option<LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn init_logging(verbose: u8) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut logger = env_logger::Builder::from_env(env);
    if let Some(level) = verbosity_level(verbose) {
        logger.filter_level(level);
    }
    logger.format_timestamp(None).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            definitions,
            output,
        } => cmd_generate(&definitions, &output),
        Commands::Analyze {
            bundle,
            input,
            report,
        } => cmd_analyze(&bundle, input.as_deref(), &report),
        Commands::Run {
            definitions,
            input,
            report,
        } => cmd_run(&definitions, input.as_deref(), &report),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_generate(definitions: &Path, output: &Path) -> Result<(), LexgenError> {
    let source = read_source(Some(definitions))?;
    let bundle = generate(&source)?;
    bundle.save_json(output)?;

    eprintln!(
        "{} {} ({} rules, {} graph states)",
        "Wrote".green().bold(),
        output.display(),
        bundle.states().rule_count(),
        bundle.graph().len()
    );
    Ok(())
}

fn cmd_analyze(
    bundle: &Path,
    input: Option<&Path>,
    report: &ReportArgs,
) -> Result<(), LexgenError> {
    let bundle = LexerBundle::load_json(bundle)?;
    analyze(&bundle, input, report)
}

fn cmd_run(
    definitions: &Path,
    input: Option<&Path>,
    report: &ReportArgs,
) -> Result<(), LexgenError> {
    let source = read_source(Some(definitions))?;
    let bundle = generate(&source)?;
    analyze(&bundle, input, report)
}

fn analyze(
    bundle: &LexerBundle,
    input: Option<&Path>,
    report: &ReportArgs,
) -> Result<(), LexgenError> {
    let text = read_source(input)?;
    let stream = tokenize(bundle, &text)?;
    write_tokens(&stream)?;

    if report.summary {
        print_summary(&stream);
    }
    if report.strict && !stream.errors.is_empty() {
        eprintln!(
            "{} {} lexical error(s)",
            "Failed:".red().bold(),
            stream.errors.len()
        );
        std::process::exit(2);
    }
    Ok(())
}

fn write_tokens(stream: &TokenStream) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for token in &stream.tokens {
        writeln!(out, "{token}")?;
    }
    out.flush()
}

fn print_summary(stream: &TokenStream) {
    let stats = stream.stats;
    eprintln!("{}", "Summary:".bold());
    eprintln!("  Tokens:     {}", stats.tokens.to_string().green());
    eprintln!("  Suppressed: {}", stats.suppressed);
    eprintln!("  Matched:    {} chars", stats.matched_chars);
    let errors = stream.errors.len().to_string();
    if stream.errors.is_empty() {
        eprintln!("  Errors:     {}", errors.green());
    } else {
        eprintln!("  Errors:     {}", errors.red());
    }
}

/// Read a whole file, or stdin for `None` and `-`
fn read_source(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) if path != Path::new(STDIN) => std::fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some(LevelFilter::Info));
        assert_eq!(verbosity_level(2), Some(LevelFilter::Debug));
        assert_eq!(verbosity_level(5), Some(LevelFilter::Trace));
    }

    #[test]
    fn test_verbose_flag_is_global_and_counted() {
        let cli = Cli::try_parse_from(["lexgen", "analyze", "lexer.json", "-vv", "--strict"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze { input, report, .. } => {
                assert_eq!(input, None);
                assert!(report.strict);
                assert!(!report.summary);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_generate_default_output() {
        let cli = Cli::try_parse_from(["lexgen", "generate", "-"]).unwrap();
        match cli.command {
            Commands::Generate { definitions, output } => {
                assert_eq!(definitions, PathBuf::from(STDIN));
                assert_eq!(output, PathBuf::from("lexer.json"));
            }
            _ => panic!("expected generate"),
        }
    }
}
