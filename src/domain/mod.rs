pub mod cluster;
pub mod job_config;
pub mod launch;
pub mod utils;
