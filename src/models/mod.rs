pub mod account;
pub mod config;
pub mod goal;
pub mod stats;
pub mod trade;
