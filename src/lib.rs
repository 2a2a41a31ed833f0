use crate::api::job_config_dto::JobConfigDto;
use crate::domain::job_config::JobConfig;
use crate::domain::launch::coordinator::LaunchCoordinator;
use crate::domain::launch::entrypoint::LaunchOutcome;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads a job configuration file without validating it.
pub fn read_job_config(file_path: &str) -> Result<JobConfigDto> {
    let dto = parse_json_file::<JobConfigDto>(file_path)?;
    log::debug!("Job configuration file '{}' parsed successfully.", file_path);
    Ok(dto)
}

/// Validates a parsed job configuration.
pub fn build_job_config(dto: JobConfigDto) -> Result<JobConfig> {
    let config = JobConfig::try_from(dto)?;
    log::info!(
        "Job configuration loaded: host {} of {} (parameter servers {}).",
        config.current_host,
        config.hosts.len(),
        if config.parameter_server_enabled { "enabled" } else { "disabled" }
    );

    Ok(config)
}

/// Reads and validates a job configuration file.
pub fn load_job_config(file_path: &str) -> Result<JobConfig> {
    build_job_config(read_job_config(file_path)?)
}

/// Launches this host's share of the job with local processes.
pub async fn train(config: &JobConfig) -> Result<LaunchOutcome> {
    LaunchCoordinator::for_job(config).train(config).await
}
