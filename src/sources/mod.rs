//! Backing source implementations.

pub mod env;
pub mod file;
pub mod vault;

#[cfg(feature = "aws")]
pub mod aws;

pub use env::EnvSource;
pub use file::FileSource;
pub use vault::{VaultConfig, VaultSource};

#[cfg(feature = "aws")]
pub use aws::AwsSource;
