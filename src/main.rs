use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use minutes::app::{self, Overrides};
use minutes::backend::{NativeBackendFactory, load_registry};
use minutes::cli::{Cli, Commands, ConfigAction};
use minutes::config::Config;
use minutes::export::MeetingNotes;
use minutes::logging::init_tracing;
use minutes::models::catalog;
use minutes::output;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    tracing::debug!(version = %minutes::version_string(), "Starting");

    let overrides = Overrides {
        model: cli.model.clone(),
        language: cli.language.clone(),
        max_audio_mb: cli.max_audio_mb,
        summarize: cli.summarize,
        strict: cli.strict,
    };
    let timeout = cli.timeout.map(Duration::from_secs);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Process {
            audio,
            title,
            export,
        } => {
            let config = app::load_config(config_path, &overrides)?;
            let pipeline = Arc::new(app::build_pipeline(&config, &NativeBackendFactory)?);
            let result = app::process_file(pipeline, &config, &audio, timeout)
                .await
                .with_context(|| format!("Failed to process {}", audio.display()))?;

            if cli.json {
                println!("{}", output::to_json(&result)?);
            } else {
                print!("{}", output::render_result(&result));
            }

            if export {
                let notes = MeetingNotes::from_result(&result, title);
                let receipt = app::export_notes(&config, &notes).await?;
                eprintln!("{}", output::render_receipt(&receipt));
            }
        }
        Commands::Transcribe { audio } => {
            let config = app::load_config(config_path, &overrides)?;
            let pipeline = Arc::new(app::build_pipeline(&config, &NativeBackendFactory)?);
            let transcript = app::transcribe_file(pipeline, &config, &audio, timeout)
                .await
                .with_context(|| format!("Failed to transcribe {}", audio.display()))?;

            if cli.json {
                println!("{}", output::to_json(&transcript)?);
            } else {
                print!("{}", output::render_transcript(&transcript));
            }
        }
        Commands::Analyze { file } => {
            let config = app::load_config(config_path, &overrides)?;
            let text = app::read_text(file.as_deref())?;
            let pipeline = Arc::new(app::build_pipeline(&config, &NativeBackendFactory)?);
            let result = app::analyze_text(pipeline, text, timeout).await?;

            if cli.json {
                println!("{}", output::to_json(&result)?);
            } else {
                print!("{}", output::render_result(&result));
            }
        }
        Commands::Export { file, title } => {
            let config = app::load_config(config_path, &overrides)?;
            let json = app::read_text(file.as_deref())?;
            let notes = app::parse_notes(&json, title)?;
            let receipt = app::export_notes(&config, &notes).await?;

            if cli.json {
                println!("{}", output::to_json(&receipt)?);
            } else {
                println!("{}", output::render_receipt(&receipt));
            }
        }
        Commands::CheckNotion => {
            let config = app::load_config(config_path, &overrides)?;
            match app::check_notion(&config).await {
                Ok(title) => println!("{} database '{}'", "Connected to".green(), title),
                Err(e) => {
                    eprintln!("{}", format!("Notion check failed: {e}").red());
                    std::process::exit(1);
                }
            }
        }
        Commands::Health => {
            let config = app::load_config(config_path, &overrides)?;
            let registry = load_registry(&config, &NativeBackendFactory)?;
            let health = registry.health();

            if cli.json {
                println!("{}", output::to_json(&health)?);
            } else {
                println!(
                    "minutes {} ({})",
                    minutes::version_string(),
                    minutes::defaults::gpu_backend()
                );
                print!("{}", output::render_health(&health));
            }
            if !health.transcription_loaded {
                std::process::exit(1);
            }
        }
        Commands::Models => {
            let config = app::load_config(config_path, &overrides)?;
            let ceiling = catalog::get_model(&config.stt.max_model).map(|m| m.size);
            print!(
                "{}",
                output::render_models(&config.stt.model, ceiling, &config.stt.model_dir)
            );
        }
        Commands::Config { action } => handle_config_command(action, config_path, &overrides)?,
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "minutes",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&std::path::Path>,
    overrides: &Overrides,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config: Config = app::load_config(custom_path, overrides)?;
            print!("{}", config.to_display_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", app::config_path(custom_path)?.display());
        }
    }
    Ok(())
}
