use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key in `additionalFrameworkParameters` that turns on the parameter-server tier.
pub const PARAMETER_SERVER_ENABLED_KEY: &str = "sagemaker_parameter_server_enabled";

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfigDto {
    pub hosts: Vec<String>,
    pub current_host: String,
    pub module_dir: String,
    pub user_entry_point: String,
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub additional_framework_parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub probe: Option<ProbeDto>,
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDto {
    pub address: Option<String>,
    pub max_attempts: Option<u32>,
    pub delay_secs: Option<u64>,
}
