pub mod cli;
pub mod config;
pub mod currency;
pub mod db;
pub mod domain;
pub mod error;
pub mod filter;
pub mod history;
pub mod report;
pub mod store;
pub mod sync;
