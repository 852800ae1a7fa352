pub mod calendar;
pub mod free_time;
pub mod module;
pub mod planning;
pub mod settings;
pub mod step;
pub mod task;
