pub mod config;
pub mod constants;
pub mod date;
pub mod geo;
pub mod plot;
