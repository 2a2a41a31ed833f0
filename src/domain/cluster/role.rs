use crate::domain::cluster::topology::{TfConfig, build_tf_config};
use crate::domain::job_config::JobConfig;
use crate::domain::launch::entrypoint::LaunchMode;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchRole {
    ParameterServer,
    MasterOrWorker,
}

/// One process the current host has to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLaunch {
    pub role: LaunchRole,
    pub mode: LaunchMode,
    /// `None` runs the entry point with its native environment, without any
    /// cluster descriptor.
    pub tf_config: Option<TfConfig>,
}

/// Ordered launches for the current host.
///
/// Without parameter servers, or on a single host, the job runs as one
/// standalone blocking process. Otherwise every host first starts a detached
/// ps process and then its blocking master/worker process.
pub fn assign_roles(config: &JobConfig) -> Result<Vec<RoleLaunch>> {
    if !config.is_distributed() {
        return Ok(vec![RoleLaunch { role: LaunchRole::MasterOrWorker, mode: LaunchMode::Blocking, tf_config: None }]);
    }

    let ps_config = build_tf_config(&config.hosts, &config.current_host, true)?;
    let worker_config = build_tf_config(&config.hosts, &config.current_host, false)?;

    Ok(vec![
        RoleLaunch { role: LaunchRole::ParameterServer, mode: LaunchMode::Detached, tf_config: Some(ps_config) },
        RoleLaunch { role: LaunchRole::MasterOrWorker, mode: LaunchMode::Blocking, tf_config: Some(worker_config) },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::host_list::HostList;
    use crate::domain::cluster::topology::TaskType;
    use crate::domain::utils::id::HostId;

    fn config(hosts: &[&str], current: &str, ps_enabled: bool) -> JobConfig {
        let hosts = HostList::try_from(hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>()).unwrap();
        JobConfig::new(hosts, HostId::new(current), ps_enabled, "/opt/ml/code", "train.py").unwrap()
    }

    #[test]
    fn test_ps_disabled_runs_standalone() {
        let launches = assign_roles(&config(&["host1", "host2"], "host2", false)).unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].role, LaunchRole::MasterOrWorker);
        assert_eq!(launches[0].mode, LaunchMode::Blocking);
        assert!(launches[0].tf_config.is_none());
    }

    #[test]
    fn test_single_host_with_ps_falls_back_to_standalone() {
        let launches = assign_roles(&config(&["host1"], "host1", true)).unwrap();
        assert_eq!(launches.len(), 1);
        assert!(launches[0].tf_config.is_none());
    }

    #[test]
    fn test_distributed_host_runs_ps_then_worker() {
        let launches = assign_roles(&config(&["host1", "host2", "host3"], "host3", true)).unwrap();
        assert_eq!(launches.len(), 2);

        let ps = &launches[0];
        assert_eq!((ps.role, ps.mode), (LaunchRole::ParameterServer, LaunchMode::Detached));
        let ps_task = &ps.tf_config.as_ref().unwrap().task;
        assert_eq!((ps_task.task_type, ps_task.index), (TaskType::ParameterServer, 2));

        let worker = &launches[1];
        assert_eq!((worker.role, worker.mode), (LaunchRole::MasterOrWorker, LaunchMode::Blocking));
        let worker_task = &worker.tf_config.as_ref().unwrap().task;
        assert_eq!((worker_task.task_type, worker_task.index), (TaskType::Worker, 1));
    }
}
