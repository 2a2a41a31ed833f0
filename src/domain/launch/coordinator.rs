use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::cluster::role::{LaunchRole, RoleLaunch, assign_roles};
use crate::domain::job_config::JobConfig;
use crate::domain::launch::entrypoint::{Entrypoint, LaunchMode, LaunchOutcome, LaunchRequest, ProcessEntrypoint};
use crate::domain::launch::probe::{CoordinationProbe, TcpProbe};
use crate::domain::launch::retry::{RetryOutcome, RetryPolicy, retry_with_policy};
use crate::error::{Error, Result};

pub const TF_CONFIG_ENV: &str = "TF_CONFIG";
pub const GPU_VISIBILITY_ENV: &str = "CUDA_VISIBLE_DEVICES";
/// Parameter servers are CPU-only.
pub const GPU_DISABLED: &str = "-1";

/// Sequences the launches of one host: readiness probe (non-master hosts
/// only), detached parameter server, then the blocking master/worker process.
pub struct LaunchCoordinator {
    entrypoint: Arc<dyn Entrypoint>,
    probe: Arc<dyn CoordinationProbe>,
    cancel: CancellationToken,
}

impl LaunchCoordinator {
    pub fn new(entrypoint: Arc<dyn Entrypoint>, probe: Arc<dyn CoordinationProbe>) -> Self {
        LaunchCoordinator { entrypoint, probe, cancel: CancellationToken::new() }
    }

    /// Local process launches, probing the address configured for the job.
    pub fn for_job(config: &JobConfig) -> Self {
        Self::new(Arc::new(ProcessEntrypoint::new()), Arc::new(TcpProbe::new(config.probe.address.clone())))
    }

    /// Cancelling this token cuts the readiness probe short. Launches are not
    /// affected.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn train(&self, config: &JobConfig) -> Result<LaunchOutcome> {
        let launches = assign_roles(config)?;

        if launches.iter().any(|launch| launch.role == LaunchRole::ParameterServer) {
            tracing::info!(host = %config.current_host, hosts = config.hosts.len(), "Running distributed training job with parameter servers");
            if config.hosts.is_master(&config.current_host) {
                tracing::info!(host = %config.current_host, "Master host launches without waiting for coordination");
            } else {
                self.await_coordination(&config.probe.retry).await;
            }
        } else {
            tracing::info!(host = %config.current_host, "Running training job without distributed coordination");
        }

        let mut blocking_outcome = None;

        for launch in &launches {
            let request = launch_request(config, launch)?;

            match launch.mode {
                LaunchMode::Detached => {
                    tracing::info!(role = ?launch.role, "Launching parameter server process");
                    // Result dropped by contract: a failed parameter server only
                    // shows up through the master/worker run.
                    if let Err(e) = self.entrypoint.run(request, LaunchMode::Detached).await {
                        tracing::debug!(error = %e, "Parameter server launch failed to start");
                    }
                }
                LaunchMode::Blocking => {
                    tracing::info!(role = ?launch.role, "Launching worker process");
                    blocking_outcome = Some(self.entrypoint.run(request, LaunchMode::Blocking).await?);
                }
            }
        }

        blocking_outcome.ok_or_else(|| Error::ConfigError("no blocking launch was planned for this host".to_string()))
    }

    async fn await_coordination(&self, policy: &RetryPolicy) {
        let target = self.probe.target();
        let probe = self.probe.clone();

        let outcome = retry_with_policy(policy, &self.cancel, |_| {
            let probe = probe.clone();
            async move { probe.probe().await }
        })
        .await;

        match outcome {
            Ok(RetryOutcome::Succeeded { attempts, .. }) => {
                tracing::info!(%target, attempts, "Coordination probe succeeded");
            }
            Ok(RetryOutcome::Exhausted { last_error, attempts }) => {
                tracing::warn!(%target, attempts, error = %last_error, "Coordination probe exhausted its attempts, launching anyway");
            }
            Ok(RetryOutcome::Cancelled { attempts }) => {
                tracing::warn!(%target, attempts, "Coordination probe cancelled, launching anyway");
            }
            Err(e) => {
                tracing::warn!(%target, error = %e, "Coordination probe failed, launching anyway");
            }
        }
    }
}

/// Request for one planned launch. Without a descriptor the job's own
/// environment is passed through untouched.
pub fn launch_request(config: &JobConfig, launch: &RoleLaunch) -> Result<LaunchRequest> {
    let mut env_vars = config.env_vars.clone();

    if let Some(tf_config) = &launch.tf_config {
        env_vars.insert(TF_CONFIG_ENV.to_string(), tf_config.to_json()?);
        if launch.role == LaunchRole::ParameterServer {
            env_vars.insert(GPU_VISIBILITY_ENV.to_string(), GPU_DISABLED.to_string());
        }
    }

    Ok(LaunchRequest {
        location: config.module_dir.clone(),
        entry_point: config.user_entry_point.clone(),
        args: config.args.clone(),
        env_vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::host_list::HostList;
    use crate::domain::job_config::ProbeConfig;
    use crate::domain::launch::entrypoint_mock::RecordingEntrypoint;
    use crate::domain::launch::probe::ScriptedProbe;
    use crate::domain::utils::id::HostId;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[test]
    fn test_base_env_is_kept_alongside_tf_config() {
        let hosts = HostList::try_from(vec!["host1".to_string(), "host2".to_string()]).unwrap();
        let config = JobConfig::new(hosts, HostId::new("host1"), true, "/opt/ml/code", "train.py")
            .unwrap()
            .with_env_vars(BTreeMap::from([("SM_MODEL_DIR".to_string(), "/opt/ml/model".to_string())]));

        let launches = assign_roles(&config).unwrap();
        let ps_request = launch_request(&config, &launches[0]).unwrap();
        let worker_request = launch_request(&config, &launches[1]).unwrap();

        assert_eq!(ps_request.env_vars.get("SM_MODEL_DIR").map(String::as_str), Some("/opt/ml/model"));
        assert_eq!(ps_request.env_vars.get(GPU_VISIBILITY_ENV).map(String::as_str), Some(GPU_DISABLED));
        assert!(worker_request.env_vars.contains_key(TF_CONFIG_ENV));
        assert!(!worker_request.env_vars.contains_key(GPU_VISIBILITY_ENV));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_probe_exhaustion_is_logged_not_raised() {
        let hosts = HostList::try_from(vec!["host1".to_string(), "host2".to_string()]).unwrap();
        let config = JobConfig::new(hosts, HostId::new("host2"), true, "/opt/ml/code", "train.py")
            .unwrap()
            .with_probe(ProbeConfig { address: "host1:2222".to_string(), retry: RetryPolicy::continue_after(2, Duration::from_secs(5)) });

        let entrypoint = RecordingEntrypoint::new();
        let probe = ScriptedProbe::new(u32::MAX);
        let coordinator = LaunchCoordinator::new(Arc::new(entrypoint.clone()), Arc::new(probe.clone()));

        let outcome = coordinator.train(&config).await.unwrap();

        assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 0 });
        assert_eq!(probe.call_count(), 2);
        assert!(logs_contain("Coordination probe exhausted its attempts"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_parameter_server_start_failure_is_logged() {
        let hosts = HostList::try_from(vec!["host1".to_string(), "host2".to_string()]).unwrap();
        let config = JobConfig::new(hosts, HostId::new("host1"), true, "/opt/ml/code", "train.py").unwrap();

        let entrypoint = RecordingEntrypoint::failing_detached();
        let coordinator = LaunchCoordinator::new(Arc::new(entrypoint.clone()), Arc::new(ScriptedProbe::new(0)));

        let outcome = coordinator.train(&config).await.unwrap();

        assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 0 });
        assert!(logs_contain("Parameter server launch failed to start"));
    }
}
