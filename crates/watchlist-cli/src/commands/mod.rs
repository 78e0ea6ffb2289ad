pub mod config;
pub mod entity;
pub mod watch;
