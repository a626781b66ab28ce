//! API for checking a server certificate against the name the client
//! intended to reach.

use rustls_pki_types::{CertificateDer, ServerName};

/// Checks that a server's end-entity certificate is valid for the name
/// the client connected to. Only consulted after the certificate chain
/// itself has been found trustworthy.
pub trait HostnameVerifier: Send + Sync + std::fmt::Debug {
    /// Returns an error if `end_entity` is not valid for `server_name`.
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
    ) -> Result<(), rustls::Error>;

    /// True if this verifier actually checks anything.
    fn is_strict(&self) -> bool;
}
