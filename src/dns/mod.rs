pub mod resolver;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use thiserror::Error;

pub use crate::core::DnsResolver;
pub use resolver::HickoryDnsResolver;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DnsError {
    #[error("DNS resolution failed: {0}")]
    Resolution(String),

    #[error("DNS resolution timed out after {0}ms")]
    Timeout(u64),

    #[error("No address records found for {0}")]
    NoRecords(String),
}
