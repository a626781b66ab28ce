//! API for suppliers of the local identity (private key and certificate
//! chain) presented to peers.

use rustls::DistinguishedName;
use rustls::sign::CertifiedKey;
use std::sync::Arc;
use time::OffsetDateTime;

/// Hints that may help an [`IdentityProvider`] select the right local
/// identity in case more than one is available.
#[derive(Debug, Default)]
pub struct IdentityHints<'a> {
    /// Server Name Indication. Will exist on the server side only.
    pub sni: Option<&'a str>,
    /// Names of trust anchors acceptable to the peer.
    pub root_hint_subjects: Option<&'a [DistinguishedName]>,
    /// Alias of an identity requested by local configuration.
    pub alias: Option<&'a str>,
}

/// Supplies the local identity for mutual authentication.
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Indicates whether or not this provider can supply any identity
    /// credentials at all.
    fn has_any_identity(&self) -> bool;

    /// Select identity credentials to use for a new TLS session.
    ///
    /// Providers should prefer an identity matching the hints and fall
    /// back to any identity they have.
    fn select_identity(&self, hints: &IdentityHints<'_>) -> Option<Arc<CertifiedKey>>;

    /// Report on when the identity presented by this provider is due to
    /// expire.
    fn identity_valid_until(&self) -> Option<OffsetDateTime> {
        None
    }
}
