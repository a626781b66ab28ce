//! Composable TLS trust and validated secure-context assembly
//!
//! Trust decisions are made by [`TrustAuthority`] implementations. The
//! built-in [`StoreTrustAuthority`] trusts the certificates of a store;
//! several authorities are merged with [`combine`] into a
//! [`CompositeTrustAuthority`] which accepts a chain if any of them does
//! and advertises the union of their issuers.
//!
//! A [`SecureContextBuilder`] loads trust and key stores, checks that the
//! requested authentication mode is fully and consistently specified and
//! produces an immutable [`SecureContextConfig`]. From that a
//! [`SecureContext`] assembles rustls client and server configurations.
//!
//! ```no_run
//! use kickstart_tls::{SecureContext, SecureContextBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SecureContextBuilder::new()
//!     .with_two_way_authentication("identity.pem", "changeit", "truststore.pem", "changeit")?
//!     .build()?;
//! let context = SecureContext::new(config)?;
//! let server_config = context.server_config()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TrustAuthority`]: kickstart_traits::trust::TrustAuthority

#![warn(missing_docs)]

#[cfg(feature = "args")]
pub mod args;
pub mod builder;
#[cfg(feature = "bundled")]
pub mod bundled;
pub mod composite;
pub mod config;
pub mod context;
pub mod crypto_provider;
pub mod hostname;
pub mod identity;
#[cfg(feature = "native")]
pub mod native;
pub mod pem;
#[cfg(test)]
mod testdata;
pub mod trust;
pub mod verifier;

pub use builder::SecureContextBuilder;
pub use composite::{CompositeTrustAuthority, combine};
pub use config::SecureContextConfig;
pub use context::SecureContext;
pub use crypto_provider::ProviderRegistry;
pub use identity::KeyMaterial;
pub use kickstart_traits;
pub use pem::PemStoreLoader;
pub use trust::StoreTrustAuthority;
