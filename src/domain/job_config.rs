use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::api::job_config_dto::{JobConfigDto, PARAMETER_SERVER_ENABLED_KEY, ProbeDto};
use crate::domain::cluster::host_list::HostList;
use crate::domain::cluster::topology::WORKER_PORT;
use crate::domain::launch::retry::RetryPolicy;
use crate::domain::utils::id::HostId;
use crate::error::{Error, Result};

pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_secs(10);

/// Pre-launch coordination probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub address: String,
    pub retry: RetryPolicy,
}

/// Everything one host needs to plan and launch its part of the job.
/// Immutable once built; every launch request is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub hosts: HostList,
    pub current_host: HostId,
    pub parameter_server_enabled: bool,
    pub module_dir: String,
    pub user_entry_point: String,
    pub args: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
    pub probe: ProbeConfig,
}

impl JobConfig {
    pub fn new(
        hosts: HostList,
        current_host: HostId,
        parameter_server_enabled: bool,
        module_dir: impl Into<String>,
        user_entry_point: impl Into<String>,
    ) -> Result<Self> {
        if !hosts.contains(&current_host) {
            return Err(Error::UnknownHost { host: current_host.to_string(), hosts: hosts.as_strings() });
        }

        let user_entry_point = user_entry_point.into();
        if user_entry_point.trim().is_empty() {
            return Err(Error::ConfigError("user entry point must not be empty".to_string()));
        }

        let probe = ProbeConfig {
            address: format!("{}:{}", hosts.master(), WORKER_PORT),
            retry: RetryPolicy::continue_after(DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_DELAY),
        };

        Ok(JobConfig {
            hosts,
            current_host,
            parameter_server_enabled,
            module_dir: module_dir.into(),
            user_entry_point,
            args: Vec::new(),
            env_vars: BTreeMap::new(),
            probe,
        })
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env_vars(mut self, env_vars: BTreeMap<String, String>) -> Self {
        self.env_vars = env_vars;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the current host, re-checking membership.
    pub fn with_current_host(mut self, current_host: HostId) -> Result<Self> {
        if !self.hosts.contains(&current_host) {
            return Err(Error::UnknownHost { host: current_host.to_string(), hosts: self.hosts.as_strings() });
        }
        self.current_host = current_host;
        Ok(self)
    }

    pub fn is_distributed(&self) -> bool {
        self.parameter_server_enabled && self.hosts.len() > 1
    }
}

impl TryFrom<JobConfigDto> for JobConfig {
    type Error = Error;

    fn try_from(dto: JobConfigDto) -> Result<Self> {
        let parameter_server_enabled = match dto.additional_framework_parameters.get(PARAMETER_SERVER_ENABLED_KEY) {
            Some(value) => parse_flag(PARAMETER_SERVER_ENABLED_KEY, value)?,
            None => false,
        };

        let hosts = HostList::try_from(dto.hosts)?;
        let args = match dto.args {
            Some(args) => args,
            None => hyperparameters_to_cmd_args(&dto.hyperparameters),
        };

        let mut config = JobConfig::new(hosts, HostId::new(dto.current_host), parameter_server_enabled, dto.module_dir, dto.user_entry_point)?
            .with_args(args)
            .with_env_vars(dto.env_vars);

        if let Some(probe_dto) = dto.probe {
            let probe = merge_probe(config.probe.clone(), probe_dto);
            config = config.with_probe(probe);
        }

        Ok(config)
    }
}

fn merge_probe(default: ProbeConfig, dto: ProbeDto) -> ProbeConfig {
    let mut retry = default.retry;
    if let Some(max_attempts) = dto.max_attempts {
        retry.max_attempts = max_attempts;
    }
    if let Some(delay_secs) = dto.delay_secs {
        retry.delay = Duration::from_secs(delay_secs);
    }

    ProbeConfig { address: dto.address.unwrap_or(default.address), retry }
}

fn parse_flag(key: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::ConfigError(format!("'{}' must be a boolean, got {}", key, other))),
    }
}

/// `--key value` pairs in key order. Strings are passed raw, everything else
/// as its JSON text.
pub fn hyperparameters_to_cmd_args(hyperparameters: &BTreeMap<String, Value>) -> Vec<String> {
    let mut args = Vec::with_capacity(hyperparameters.len() * 2);
    for (key, value) in hyperparameters {
        args.push(format!("--{}", key));
        args.push(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }
    args
}
