pub mod host_list;
pub mod role;
pub mod topology;
