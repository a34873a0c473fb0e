//! Credential brokers.

mod remote;
#[cfg(feature = "storage-s3")]
mod s3;

pub use remote::RemoteCredentialBroker;
#[cfg(feature = "storage-s3")]
pub use s3::{S3BrokerSettings, S3CredentialBroker};
