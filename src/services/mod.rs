pub mod account_lock;
pub mod allocator;
pub mod availability;
pub mod clock;
pub mod constraint_catalog;
pub mod free_time_service;
pub mod module_service;
pub mod planning_service;
pub mod rating_service;
pub mod schedule_utils;
pub mod settings_service;
pub mod task_service;
