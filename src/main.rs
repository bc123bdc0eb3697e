mod debug_report;

use glossa::{Language, Options};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_COUNT: usize = 10;

fn main() -> ExitCode {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let language = match Language::from_paths(&config.phonetics, &config.language) {
        Ok(language) => language,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Some(word) = &config.apply {
        return match language.apply_changes(word) {
            Ok(changes) => {
                if config.verbose {
                    debug_report::print_applied(word, &changes, config.color);
                } else {
                    println!("{}", changes.last().map_or(word.as_str(), |change| change.output.as_str()));
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::from(1)
            }
        };
    }

    let mut failed = false;
    for (number, result) in language.generate_batch(config.count, &config.options).into_iter().enumerate() {
        match result {
            Ok(trace) if config.verbose => debug_report::print_word(number + 1, &trace, config.color),
            Ok(trace) => println!("{}", trace.word),
            Err(err) => {
                failed = true;
                debug_report::print_failure(number + 1, &format!("error: {err}"), config.color);
            }
        }
    }

    if failed { ExitCode::from(1) } else { ExitCode::SUCCESS }
}

struct CliConfig {
    phonetics: PathBuf,
    language: PathBuf,
    count: usize,
    options: Options,
    apply: Option<String>,
    verbose: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut phonetics: Option<PathBuf> = None;
    let mut language: Option<PathBuf> = None;
    let mut count = DEFAULT_COUNT;
    let mut options = Options::default();
    let mut apply: Option<String> = None;
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("glossa {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "-v" | "--verbose" => verbose = true,
            "-p" | "--phonetics" => phonetics = Some(PathBuf::from(value("--phonetics")?)),
            "-l" | "--language" => language = Some(PathBuf::from(value("--language")?)),
            "-n" | "--count" => count = parse_number("--count", &value("--count")?)?,
            "--seed" => options.seed = Some(parse_number("--seed", &value("--seed")?)?),
            "--syllables" => options.syllables = Some(parse_number("--syllables", &value("--syllables")?)?),
            "--apply" => {
                if apply.is_some() {
                    return Err("error: --apply provided multiple times".to_string());
                }
                apply = Some(value("--apply")?);
            }
            _ => return Err(format!("error: unknown option '{arg}'\n\n{}", help_text())),
        }
    }

    let phonetics = phonetics.ok_or_else(|| format!("error: --phonetics is required\n\n{}", help_text()))?;
    let language = language.ok_or_else(|| format!("error: --language is required\n\n{}", help_text()))?;

    Ok(CliConfig { phonetics, language, count, options, apply, verbose, color })
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value.parse().map_err(|_| format!("error: invalid {flag} '{value}' (expected a non-negative integer)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "glossa {version}

Word generator and sound-change engine for invented languages.

Usage:
  glossa --phonetics <path> --language <path> [OPTIONS]

Options:
  -p, --phonetics <path>     Phonetics document (segment tree).
  -l, --language <path>      Language document (syllable grammar and changes).
  -n, --count <n>            Number of words to generate. Default: {default_count}
  --seed <u64>               Seed for reproducible output.
  --syllables <n>            Fixed syllable count instead of sampling one.
  --apply <word>             Run the sound changes over <word> instead of generating.
  -v, --verbose              Print syllables and every change step per word.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  GLOSSA_DEBUG_RULES=1       Trace rule compilation and application on stderr.

Exit codes:
  0  Success.
  1  At least one word failed.
  2  Invalid arguments or configuration.
",
        version = env!("CARGO_PKG_VERSION"),
        default_count = DEFAULT_COUNT
    )
}
