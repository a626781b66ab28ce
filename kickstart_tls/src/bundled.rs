//! Trust in the Mozilla root program, as bundled at build time.
//!
//! Unlike [`crate::native`] this does not depend on the platform, so it
//! gives the same answers on every host.

use rustls::crypto::CryptoProvider;
use std::sync::Arc;

use crate::trust::{StoreTrustAuthority, TrustError};

/// Name of the authority returned by [`bundled_trust_authority`].
pub const BUNDLED_AUTHORITY_NAME: &str = "bundled";

/// A [`StoreTrustAuthority`] over the bundled root certificates.
pub fn bundled_trust_authority(
    crypto_provider: &Arc<CryptoProvider>,
) -> Result<StoreTrustAuthority, TrustError> {
    StoreTrustAuthority::from_certificates(
        BUNDLED_AUTHORITY_NAME,
        webpki_root_certs::TLS_SERVER_ROOT_CERTS.iter().cloned(),
        crypto_provider,
    )
}
