//! Trust in the platform's certificate store.

use rustls::crypto::CryptoProvider;
use std::sync::Arc;

use crate::trust::{StoreTrustAuthority, TrustError};

/// Name of the authority returned by [`system_trust_authority`].
pub const SYSTEM_AUTHORITY_NAME: &str = "system";

/// A [`StoreTrustAuthority`] over the platform's trusted root
/// certificates, or `None` if the platform supplies none.
///
/// Errors reading individual platform certificate sources are logged and
/// otherwise ignored.
pub fn system_trust_authority(
    crypto_provider: &Arc<CryptoProvider>,
) -> Result<Option<StoreTrustAuthority>, TrustError> {
    let result = rustls_native_certs::load_native_certs();
    for e in &result.errors {
        log::warn!("Error loading platform trust store: {}", e);
    }
    if result.certs.is_empty() {
        log::warn!("The platform trust store has no certificates");
        return Ok(None);
    }
    StoreTrustAuthority::from_certificates(SYSTEM_AUTHORITY_NAME, result.certs, crypto_provider)
        .map(Some)
}
