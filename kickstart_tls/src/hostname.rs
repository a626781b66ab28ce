//! Hostname verification for client connections.

use kickstart_traits::hostname::HostnameVerifier;
use rustls::client::verify_server_name;
use rustls::server::ParsedCertificate;
use rustls_pki_types::{CertificateDer, ServerName};
use std::sync::Arc;

/// Requires the server certificate's subject alternative names to match
/// the name the client connected to, per webpki's rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictHostnameVerifier;

impl HostnameVerifier for StrictHostnameVerifier {
    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
    ) -> Result<(), rustls::Error> {
        let parsed = ParsedCertificate::try_from(end_entity)?;
        verify_server_name(&parsed, server_name)
    }

    fn is_strict(&self) -> bool {
        true
    }
}

/// Accepts any server certificate for any name.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHostnameVerifier;

impl HostnameVerifier for NoopHostnameVerifier {
    fn verify(&self, _: &CertificateDer<'_>, _: &ServerName<'_>) -> Result<(), rustls::Error> {
        Ok(())
    }

    fn is_strict(&self) -> bool {
        false
    }
}

/// [`StrictHostnameVerifier`] if `enabled`, else [`NoopHostnameVerifier`].
pub fn hostname_verifier(enabled: bool) -> Arc<dyn HostnameVerifier> {
    if enabled {
        Arc::new(StrictHostnameVerifier)
    } else {
        log::warn!("Hostname verification is disabled");
        Arc::new(NoopHostnameVerifier)
    }
}
