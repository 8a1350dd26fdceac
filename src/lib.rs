pub mod catalog;
pub mod config;
pub mod feed;
pub mod watch;
