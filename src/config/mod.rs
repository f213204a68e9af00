#[cfg(feature = "cli")]
pub mod cli;
pub mod datasets;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
