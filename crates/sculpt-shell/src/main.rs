//! `sculpt` - edit a 3D scene with plain-language commands

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sculpt_core::prelude::*;
use sculpt_interpreter::PromptBuilder;
use sculpt_scene::SceneState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "sculpt.toml";

fn cli() -> Command {
    Command::new("sculpt")
        .version(sculpt_core::VERSION)
        .about("Natural-language scene editor")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (defaults to ./sculpt.toml when present)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Seed for default positions"),
        )
        .arg(
            Arg::new("offer")
                .long("offer")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Offer this many models per search instead of importing the best"),
        )
        .subcommand(Command::new("repl").about("Read commands from stdin (default)"))
        .subcommand(
            Command::new("run")
                .about("Run commands in order and print their feedback")
                .arg(
                    Arg::new("commands")
                        .required(true)
                        .num_args(1..)
                        .help("Commands, one per argument"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print reports and the final scene as JSON"),
                ),
        )
        .subcommand(Command::new("prompt").about("Print the system prompt for an empty scene"))
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &ArgMatches) -> Result<SculptConfig> {
    let path = args
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = SculptConfig::load(Some(&path))
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    if let Some(seed) = args.get_one::<u64>("seed") {
        config = config.with_rng_seed(*seed);
    }
    if let Some(count) = args.get_one::<usize>("offer") {
        config = config.with_offer_count(*count);
    }
    config.validate().context("invalid command-line overrides")?;
    Ok(config)
}

/// A line typed into the REPL
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Command(&'a str),
    Choose(usize),
    Scene,
    Help,
    Quit,
    Blank,
}

fn parse_line(line: &str) -> Result<Input<'_>> {
    let line = line.trim();
    let Some(meta) = line.strip_prefix(':') else {
        return Ok(if line.is_empty() { Input::Blank } else { Input::Command(line) });
    };

    let mut parts = meta.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("choose"), Some(n)) => Ok(Input::Choose(
            n.parse().with_context(|| format!("'{n}' is not a candidate number"))?,
        )),
        (Some("choose"), None) => bail!("usage: :choose <number>"),
        (Some("scene"), _) => Ok(Input::Scene),
        (Some("help"), _) => Ok(Input::Help),
        (Some("quit" | "exit" | "q"), _) => Ok(Input::Quit),
        _ => bail!("unknown shell command ':{meta}', try :help"),
    }
}

const HELP: &str = "\
Type a command such as `add a red cube and a sphere`.
  :choose N   import the N-th offered model
  :scene      print the scene as JSON
  :quit       leave
Ctrl-C cancels a running command.";

async fn repl(pipeline: Arc<CommandPipeline>) -> Result<()> {
    let canceller = Arc::clone(&pipeline);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"sculpt> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let output = match parse_line(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Blank) => String::new(),
            Ok(Input::Help) => HELP.to_string(),
            Ok(Input::Scene) => serde_json::to_string_pretty(&pipeline.snapshot())?,
            Ok(Input::Command(text)) => describe(pipeline.execute(text).await),
            Ok(Input::Choose(index)) => describe(pipeline.choose(index).await),
            Err(e) => e.to_string(),
        };
        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.write_all(b"sculpt> ").await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn describe(outcome: Result<CommandReport, PipelineError>) -> String {
    match outcome {
        Ok(report) => report.text(),
        Err(e) => format!("error: {e}"),
    }
}

async fn run(pipeline: &CommandPipeline, args: &ArgMatches) -> Result<()> {
    let json = args.get_flag("json");
    let mut reports = Vec::new();

    for command in args.get_many::<String>("commands").into_iter().flatten() {
        let report = pipeline
            .execute(command)
            .await
            .with_context(|| format!("command '{command}' did not run"))?;
        if json {
            reports.push(report);
        } else {
            println!("> {command}\n{}", report.text());
        }
    }

    if json {
        let out = serde_json::json!({
            "reports": reports,
            "scene": pipeline.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("prompt", _)) => {
            let prompt = PromptBuilder::new().with_max_snapshot_objects(config.interpreter.max_snapshot_objects);
            println!("{}", prompt.system_prompt(&SceneState::new().snapshot()));
        }
        Some(("config", _)) => {
            let mut shown = config.clone();
            if shown.interpreter.api_key.is_some() {
                shown.interpreter.api_key = Some("<redacted>".into());
            }
            if shown.assets.service.token.is_some() {
                shown.assets.service.token = Some("<redacted>".into());
            }
            print!("{}", toml::to_string_pretty(&shown).context("failed to render configuration")?);
        }
        Some(("run", args)) => {
            let pipeline = CommandPipeline::from_config(&config).context("failed to start pipeline")?;
            run(&pipeline, args).await?;
        }
        _ => {
            let pipeline = CommandPipeline::from_config(&config).context("failed to start pipeline")?;
            tracing::info!(model = %config.interpreter.model, "shell ready");
            repl(Arc::new(pipeline)).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_meta_commands() {
        assert_eq!(parse_line(" add a cube ").unwrap(), Input::Command("add a cube"));
        assert_eq!(parse_line("   ").unwrap(), Input::Blank);
        assert_eq!(parse_line(":choose 2").unwrap(), Input::Choose(2));
        assert_eq!(parse_line(":scene").unwrap(), Input::Scene);
        assert_eq!(parse_line(":q").unwrap(), Input::Quit);
        assert!(parse_line(":choose").is_err());
        assert!(parse_line(":choose two").is_err());
        assert!(parse_line(":teleport").is_err());
    }

    #[test]
    fn run_requires_commands() {
        assert!(cli().try_get_matches_from(["sculpt", "run"]).is_err());
        let matches = cli()
            .try_get_matches_from(["sculpt", "--seed", "9", "run", "add a cube", "list"])
            .unwrap();
        assert_eq!(matches.get_one::<u64>("seed"), Some(&9));
        let (_, run) = matches.subcommand().unwrap();
        assert_eq!(run.get_many::<String>("commands").unwrap().count(), 2);
    }

    #[test]
    fn overrides_apply_to_loaded_config() {
        let matches = cli()
            .try_get_matches_from(["sculpt", "--config", "/nonexistent/sculpt.toml", "--offer", "3", "config"])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.assets.search_mode(), SearchMode::Offer { count: 3 });
    }
}
