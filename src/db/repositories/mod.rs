pub mod free_time_repository;
pub mod module_repository;
pub mod settings_repository;
pub mod step_repository;
pub mod task_repository;
