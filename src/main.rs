use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod config;
mod discovery;
mod error;
mod labels;
mod metrics;
mod navigation;
mod paths;
mod scorecards;
mod server;

use cli::{Command, FetchArgs, RootArgs};
use config::ViewerConfig;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            print_json(&serde_json::json!({ "error": format!("{err:#}") }));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // stdout carries JSON; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(args: RootArgs) -> Result<ExitCode> {
    let config = config::build_config(&args.overrides())?;
    match args.command {
        Command::Serve(serve) => {
            server::serve(&config, &serve.addr)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Projects => Ok(emit(&config, "get_projects", &[])),
        Command::Scorecard(scorecard) => Ok(emit(
            &config,
            "get_scorecard_data",
            &[(api::PROJECT_PARAM, Some(scorecard.project))],
        )),
        Command::Navigate(navigate) => Ok(emit(
            &config,
            "get_navigation",
            &[
                (api::PROJECT_PARAM, Some(navigate.project)),
                (api::CATEGORY_PARAM, navigate.category),
            ],
        )),
        Command::Fetch(fetch) => cmd_fetch(&config, fetch),
    }
}

fn emit(config: &ViewerConfig, action: &str, params: &[(&str, Option<String>)]) -> ExitCode {
    let params: BTreeMap<String, String> = params
        .iter()
        .filter_map(|(key, value)| value.clone().map(|value| (key.to_string(), value)))
        .collect();
    let response = api::handle(config, Some(action), &params);
    println!("{}", response.to_pretty_json());
    if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_fetch(config: &ViewerConfig, args: FetchArgs) -> Result<ExitCode> {
    let served = match config
        .data_root()
        .and_then(|root| root.read_file(&args.path))
    {
        Ok(served) => served,
        Err(err) => {
            tracing::warn!(path = %args.path, kind = err.kind(), "fetch failed");
            print_json(&err.to_json());
            return Ok(ExitCode::FAILURE);
        }
    };
    match &args.out {
        Some(out) => {
            std::fs::write(out, &served.bytes)
                .with_context(|| format!("write {}", out.display()))?;
            tracing::info!(
                path = %args.path,
                out = %out.display(),
                bytes = served.bytes.len(),
                content_type = served.content_type,
                "file fetched"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&served.bytes).context("write stdout")?;
            stdout.flush().context("flush stdout")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &serde_json::Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{text}");
}
