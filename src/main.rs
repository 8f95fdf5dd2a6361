//! mlp - ML platform command line client

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mlplatform_sdk::{DeployRequest, Model, RegisterRequest, SdkConfig};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mlp")]
#[command(about = "ML platform model registry client", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty", global = true)]
    log_format: String,

    /// Hide transfer progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local artifact and register it as a model version
    Register {
        /// File or directory to upload
        local_path: PathBuf,
        /// Existing model to add a version to
        #[arg(long)]
        model_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long = "type")]
        model_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Download a model version (latest by default)
    Download {
        model_id: String,
        local_path: PathBuf,
        #[arg(long)]
        version: Option<u32>,
    },
    /// Delete one version (latest by default)
    Unregister {
        model_id: String,
        #[arg(long)]
        version: Option<u32>,
    },
    /// Delete a model and all its versions
    UnregisterAll { model_id: String },
    /// List the model's versions
    Explain { model_id: String },
    /// Deploy a model version to an inference service
    Deploy {
        model_id: String,
        #[arg(long)]
        image_url: String,
        #[arg(long)]
        flavor_id: String,
        #[arg(long)]
        version: Option<u32>,
        #[arg(long, default_value_t = 1)]
        replica: u32,
        /// Environment variable for the service, KEY=VALUE (repeatable)
        #[arg(long = "env", value_parser = parse_env)]
        envs: Vec<(String, String)>,
        #[arg(long)]
        description: Option<String>,
    },
}

fn parse_env(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let mut config = SdkConfig::load(cli.config)?;
    if cli.no_progress {
        config.show_progress = false;
    }
    config.validate()?;

    tracing::debug!(
        service_host = %config.service_host,
        region = %config.credential.region,
        "Configuration loaded"
    );

    match cli.command {
        Command::Register {
            local_path,
            model_id,
            name,
            format,
            model_type,
            description,
        } => {
            let mut model = Model::from_config(&config, model_id, Some(local_path))?;
            model
                .register(RegisterRequest {
                    model_name: name,
                    model_format: format,
                    model_type,
                    description,
                })
                .await
                .context("Failed to register model")?;
            println!(
                "registered model {} version {} at {}",
                model.model_id().unwrap_or_default(),
                model.model_version().unwrap_or_default(),
                model.remote_path().unwrap_or_default()
            );
        }
        Command::Download {
            model_id,
            local_path,
            version,
        } => {
            let mut model = Model::from_config(&config, Some(model_id), None)?;
            model
                .download(version, Some(local_path))
                .await
                .context("Failed to download model")?;
        }
        Command::Unregister { model_id, version } => {
            let mut model = Model::from_config(&config, Some(model_id), None)?;
            model.select_version(version);
            model
                .unregister()
                .await
                .context("Failed to unregister model version")?;
        }
        Command::UnregisterAll { model_id } => {
            let mut model = Model::from_config(&config, Some(model_id), None)?;
            model
                .unregister_all_versions()
                .await
                .context("Failed to unregister model")?;
        }
        Command::Explain { model_id } => {
            let model = Model::from_config(&config, Some(model_id), None)?;
            model.explain().await.context("Failed to list model versions")?;
        }
        Command::Deploy {
            model_id,
            image_url,
            flavor_id,
            version,
            replica,
            envs,
            description,
        } => {
            let mut model = Model::from_config(&config, Some(model_id), None)?;
            let request = DeployRequest {
                model_version: version,
                replica,
                envs: envs.into_iter().collect::<HashMap<_, _>>(),
                description,
                ..DeployRequest::new(image_url, flavor_id)
            };
            let service = model.deploy(request).await.context("Failed to deploy model")?;
            println!(
                "deployed {} as service {}",
                service.service_name(),
                service.service_id().unwrap_or_default()
            );
        }
    }

    Ok(())
}
