// Infrastructure module - background task tracking and retry timing
pub mod backoff;
pub mod task_manager;

pub use backoff::Backoff;
pub use task_manager::TaskManager;
