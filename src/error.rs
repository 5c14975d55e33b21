use crate::assertions::AssertionError;
use crate::config::ConfigError;
use crate::container::ContainerError;
use crate::scrape::ScrapeError;
use thiserror::Error;

/// Any failure of a smoke case
#[derive(Debug, Error)]
pub enum SmokeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Assertion(#[from] AssertionError),
}
