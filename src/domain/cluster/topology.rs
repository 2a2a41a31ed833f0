use serde::{Deserialize, Serialize};

use crate::domain::cluster::host_list::HostList;
use crate::domain::utils::id::HostId;
use crate::error::{Error, Result};

/// Port the master and worker servers listen on.
pub const WORKER_PORT: u16 = 2222;
/// Port the parameter servers listen on.
pub const PARAMETER_SERVER_PORT: u16 = 2223;
/// Environment name handed to every launched process.
pub const TF_ENVIRONMENT: &str = "cloud";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "master")]
    Master,
    #[serde(rename = "worker")]
    Worker,
    #[serde(rename = "ps")]
    ParameterServer,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Master => "master",
            TaskType::Worker => "worker",
            TaskType::ParameterServer => "ps",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub index: usize,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

/// Address map of every role in the cluster. Field order is the serialized
/// key order, which keeps `TF_CONFIG` byte-stable across nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub master: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker: Vec<String>,
}

/// The descriptor a launched process reads from `TF_CONFIG` to locate itself
/// within the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfConfig {
    pub cluster: ClusterTopology,
    pub environment: String,
    pub task: Task,
}

impl TfConfig {
    /// Compact JSON form injected as the `TF_CONFIG` value.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn host_addresses<'a>(hosts: impl IntoIterator<Item = &'a HostId>, port: u16) -> Vec<String> {
    hosts.into_iter().map(|host| format!("{}:{}", host, port)).collect()
}

/// Builds the cluster descriptor as seen by `current_host`.
///
/// The ps tier is part of the cluster whenever there is more than one host.
/// With `as_parameter_server` the returned task is the host's ps task
/// (indexed over the full host list) instead of its master/worker task.
pub fn build_tf_config(hosts: &HostList, current_host: &HostId, as_parameter_server: bool) -> Result<TfConfig> {
    let position = hosts
        .position(current_host)
        .ok_or_else(|| Error::UnknownHost { host: current_host.to_string(), hosts: hosts.as_strings() })?;

    let ps = if hosts.len() > 1 { Some(host_addresses(hosts, PARAMETER_SERVER_PORT)) } else { None };

    let cluster = ClusterTopology {
        master: host_addresses([hosts.master()], WORKER_PORT),
        ps,
        worker: host_addresses(hosts.workers(), WORKER_PORT),
    };

    let task = if as_parameter_server {
        if cluster.ps.is_none() {
            return Err(Error::InvalidTopology(
                "Cannot have a ps task if there are no parameter servers in the cluster".to_string(),
            ));
        }
        Task { index: position, task_type: TaskType::ParameterServer }
    } else if hosts.is_master(current_host) {
        Task { index: 0, task_type: TaskType::Master }
    } else {
        // The master occupies slot 0 of the host list.
        Task { index: position - 1, task_type: TaskType::Worker }
    };

    Ok(TfConfig { cluster, environment: TF_ENVIRONMENT.to_string(), task })
}
