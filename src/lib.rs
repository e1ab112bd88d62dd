pub mod app;
pub mod client;
pub mod config;
pub mod generator;
pub mod http;
pub mod shutdown;
pub mod signal;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, Error>;

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
