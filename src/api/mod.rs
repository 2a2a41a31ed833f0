pub mod job_config_dto;
