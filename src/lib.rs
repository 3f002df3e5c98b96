#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod transfers;
