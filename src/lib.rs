pub mod cli;
pub mod config;
pub mod contract;
pub mod generator;
pub mod parser;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
