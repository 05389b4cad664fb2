pub mod address;
pub mod config;
mod header_tools;
pub mod lookup;
pub mod non_zero_duration;
pub mod service;
mod uri_tools;
