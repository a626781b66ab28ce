//! Shared trait definitions for suppliers and consumers of TLS trust and
//! identity material.
//!
//! This crate defines traits that are designed to be implemented by one
//! component and consumed by another, so that the implementor and the
//! consumer do not depend on one another:
//!
//! * [`store::StoreLoader`] turns a [`store::StoreSource`] into an
//!   in-memory [`store::Store`] of certificates and keys.
//! * [`trust::TrustAuthority`] decides whether a presented certificate
//!   chain is trusted for a given [`trust::Usage`].
//! * [`identity::IdentityProvider`] supplies the local identity for
//!   mutual authentication.
//! * [`hostname::HostnameVerifier`] checks a server certificate against
//!   the name the client expected.
//!
//! Concrete implementations live in [`kickstart_tls`].
//!
//! [`kickstart_tls`]: https://docs.rs/kickstart_tls/latest/kickstart_tls/

#![warn(missing_docs)]

pub mod hostname;
pub mod identity;
pub mod store;
pub mod trust;

pub use rustls;
pub use rustls_pki_types;
