pub mod config;
pub mod fraud;
pub mod http;
pub mod humanize;
pub mod journey;
pub mod network;
pub mod observability;
pub mod spinner;
pub mod store;
pub mod transform;
pub mod transport;
