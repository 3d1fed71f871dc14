use anyhow::{Context, Result};
use clap::Parser;
use racecall::app;
use racecall::cli::{Cli, Commands, ConfigAction};
use racecall::config::{Config, EnginePreference};
use racecall::source::EventSource;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            run(config, None, None, None, false, cli.quiet).await?;
        }
        Some(Commands::Run {
            source_url,
            poll,
            engine,
            no_voice,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            run(config, source_url, poll, engine, no_voice, cli.quiet).await?;
        }
        Some(Commands::Replay { file }) => {
            let config = load_config(cli.config.as_deref())?;
            app::run_replay(config, &file, cli.quiet).await?;
        }
        Some(Commands::Speak { text, engine }) => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_engine_override(&mut config, engine.as_deref())?;
            app::run_speak(config, &text).await?;
        }
        Some(Commands::Engines) => {
            app::run_engines().await;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

async fn run(
    mut config: Config,
    source_url: Option<String>,
    poll: Option<std::time::Duration>,
    engine: Option<String>,
    no_voice: bool,
    quiet: bool,
) -> Result<()> {
    if let Some(url) = source_url {
        config.source.url = url;
    }
    if let Some(poll) = poll {
        config.source.poll_interval = humantime::format_duration(poll).to_string();
    }
    apply_engine_override(&mut config, engine.as_deref())?;
    if no_voice {
        config.voice.enabled = false;
    }

    let source = build_source(&config)?;
    app::run_race(config, source, quiet).await?;
    Ok(())
}

#[cfg(feature = "http-source")]
fn build_source(config: &Config) -> Result<Arc<dyn EventSource>> {
    Ok(Arc::new(racecall::source::HttpEventSource::new(
        &config.source.url,
    )))
}

#[cfg(not(feature = "http-source"))]
fn build_source(_config: &Config) -> Result<Arc<dyn EventSource>> {
    anyhow::bail!(
        "built without the http-source feature; use `racecall replay <file>` instead"
    )
}

fn apply_engine_override(config: &mut Config, engine: Option<&str>) -> Result<()> {
    if let Some(name) = engine {
        config.voice.engine = EnginePreference::parse(name)
            .with_context(|| format!("unknown engine '{name}' (auto, remote, spd, espeak, none)"))?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            let target = path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            if target.exists() {
                anyhow::bail!("config file already exists at {}", target.display());
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, toml::to_string_pretty(&Config::default())?)?;
            eprintln!("racecall: wrote default config to {}", target.display());
        }
    }
    Ok(())
}
