//! Catalog configuration, read from the environment.
//!
//! - `STOREFRONT_PAGE_SIZE`: rows per listing page (1..=500, default 20).
//! - `STOREFRONT_LOG_FORMAT`: `json` (default) or `pretty`.
//!
//! `RUST_LOG` is read by the observability crate.

use storefront_observability::LogFormat;
use storefront_products::DEFAULT_PAGE_SIZE;

pub const PAGE_SIZE_VAR: &str = "STOREFRONT_PAGE_SIZE";
pub const LOG_FORMAT_VAR: &str = "STOREFRONT_LOG_FORMAT";

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub log_format: LogFormat,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            log_format: LogFormat::Json,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Install the process-wide tracing subscriber in the configured format.
    pub fn init_observability(&self) {
        storefront_observability::init_with(self.log_format);
    }

    /// Build from any key lookup. Invalid values are logged and replaced by
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let page_size = match lookup(PAGE_SIZE_VAR) {
            None => defaults.page_size,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
                _ => {
                    tracing::warn!(
                        "{PAGE_SIZE_VAR}={raw:?} is not in 1..={MAX_PAGE_SIZE}; using {}",
                        defaults.page_size
                    );
                    defaults.page_size
                }
            },
        };

        let log_format = match lookup(LOG_FORMAT_VAR) {
            None => defaults.log_format,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{LOG_FORMAT_VAR}: {err}; using json");
                defaults.log_format
            }),
        };

        Self {
            page_size,
            log_format,
        }
    }
}
