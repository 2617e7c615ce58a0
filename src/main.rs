use anyhow::{bail, Context};
use seisho::config::{expand_path, AutoCorrectConfig};
use seisho::logging::{LogLevel, Logger};
use seisho::{error, render, EditorSession};
use std::io::{Read, Write};
use std::path::PathBuf;

const USAGE: &str = "\
usage: seisho [OPTIONS] < input.txt

Reads text from standard input, auto-corrects it and writes it to standard output.

options:
  --marks               print a caret line under each flagged word
  --color               underline flagged words with ANSI escapes
  --config <path>       load settings from a JSON file
  --set <key>=<value>   override one setting (enabled, underline-color, undo-grouping)
  --log-level <level>   debug, info, warning or error (default: warning)
  --log-file <path>     also append log lines to a file
  --help                show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Plain,
    Marks,
    Ansi,
}

#[derive(Debug)]
struct Options {
    output: OutputMode,
    config_path: Option<PathBuf>,
    overrides: Vec<(String, String)>,
    log_level: LogLevel,
    log_file: Option<PathBuf>,
    help: bool,
}

fn main() -> anyhow::Result<()> {
    error::setup_panic_handler();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut logger = Logger::new(options.log_level);
    if let Some(path) = &options.log_file {
        logger = logger.with_file_output(path);
    }
    logger.install().context("failed to install logger")?;

    let config = load_config(&options)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read standard input")?;
    let trailing_newline = input.ends_with('\n');
    if trailing_newline {
        input.pop();
    }

    let session = EditorSession::with_text(&input, config);
    let mut output = match options.output {
        OutputMode::Plain => session.text(),
        OutputMode::Marks => render::with_carets(session.document()),
        OutputMode::Ansi => render::to_ansi(session.document()),
    };
    if trailing_newline {
        output.push('\n');
    }

    std::io::stdout()
        .write_all(output.as_bytes())
        .context("failed to write output")?;
    Ok(())
}

fn load_config(options: &Options) -> anyhow::Result<AutoCorrectConfig> {
    let mut config = match &options.config_path {
        Some(path) => AutoCorrectConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AutoCorrectConfig::load_default().context("failed to load default config")?,
    };

    for (key, value) in &options.overrides {
        config.set_value(key, value)?;
    }
    Ok(config)
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options {
        output: OutputMode::Plain,
        config_path: None,
        overrides: Vec::new(),
        log_level: LogLevel::Warning,
        log_file: None,
        help: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--marks" => options.output = OutputMode::Marks,
            "--color" => options.output = OutputMode::Ansi,
            "--help" | "-h" => options.help = true,
            "--config" => {
                let Some(path) = iter.next() else {
                    bail!("--config requires a path");
                };
                options.config_path = Some(expand_path(path));
            }
            "--set" => {
                let Some((key, value)) = iter.next().and_then(|pair| pair.split_once('=')) else {
                    bail!("--set requires <key>=<value>");
                };
                options.overrides.push((key.to_string(), value.to_string()));
            }
            "--log-level" => {
                let Some(level) = iter.next().and_then(|name| LogLevel::from_str(name)) else {
                    bail!("--log-level requires one of debug, info, warning, error");
                };
                options.log_level = level;
            }
            "--log-file" => {
                let Some(path) = iter.next() else {
                    bail!("--log-file requires a path");
                };
                options.log_file = Some(expand_path(path));
            }
            other => bail!("unknown argument '{}'\n\n{}", other, USAGE),
        }
    }

    Ok(options)
}
