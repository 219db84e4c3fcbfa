pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod mutation;
pub mod parallel;
pub mod report;
pub mod session;
pub mod verify;
