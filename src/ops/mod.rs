pub mod calendar;
pub mod export;
pub mod import;
pub mod notify;
pub mod stats;
pub mod task_ops;
pub mod view;
