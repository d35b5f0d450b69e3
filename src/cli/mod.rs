pub mod commands;
pub mod handlers;
pub mod notifier;
pub mod output;
