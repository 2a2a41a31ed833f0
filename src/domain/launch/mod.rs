pub mod coordinator;
pub mod entrypoint;
pub mod entrypoint_mock;
pub mod probe;
pub mod retry;
