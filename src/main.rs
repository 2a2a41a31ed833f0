use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use tf_cluster_launcher::api::job_config_dto::JobConfigDto;
use tf_cluster_launcher::domain::job_config::JobConfig;
use tf_cluster_launcher::domain::utils::id::HostId;
use tf_cluster_launcher::{build_job_config, logger, read_job_config, train};

#[derive(Debug, Parser)]
#[command(name = "tf-cluster-launcher", about = "Launches parameter-server, master and worker processes for one host")]
struct Cli {
    /// Path to the job configuration JSON file.
    #[arg(short, long)]
    config: String,

    /// Log level (error, warn, info, debug, trace). Overrides the file and RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Overrides `currentHost` from the configuration file.
    #[arg(long)]
    current_host: Option<String>,
}

fn configure(dto: JobConfigDto, cli: &Cli) -> anyhow::Result<JobConfig> {
    let mut config = build_job_config(dto).with_context(|| format!("validating job configuration from '{}'", cli.config))?;

    if let Some(host) = &cli.current_host {
        config = config.with_current_host(HostId::new(host.clone())).context("applying --current-host")?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let dto = read_job_config(&cli.config);
    let file_level = dto.as_ref().ok().and_then(|dto| dto.log_level.clone());
    logger::init(cli.log_level.as_deref().or(file_level.as_deref()));

    let loaded = dto
        .with_context(|| format!("loading job configuration from '{}'", cli.config))
        .and_then(|dto| configure(dto, &cli));

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match train(&config).await {
        Ok(outcome) => {
            log::info!("Training finished: {:?}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Training failed: {}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
