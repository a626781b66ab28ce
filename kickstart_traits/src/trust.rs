//! API for trust authorities: things that decide whether a certificate
//! chain presented by a peer is trusted.
//!
//! A [`TrustAuthority`] owns a list of accepted issuers and can verify a
//! chain against them. Trust authorities can be combined, so they report
//! rejection as a [`Decision`] value rather than as an error: a chain
//! rejected by one authority may well be accepted by another.
//!
//! ```
//! use kickstart_traits::trust::{Decision, TrustAuthority, Usage};
//! use kickstart_traits::rustls_pki_types::{CertificateDer, UnixTime};
//!
//! #[derive(Debug)]
//! struct NobodyIsTrusted;
//!
//! impl TrustAuthority for NobodyIsTrusted {
//!     fn name(&self) -> &str {
//!         "nobody"
//!     }
//!
//!     fn accepted_issuers(&self) -> &[CertificateDer<'static>] {
//!         &[]
//!     }
//!
//!     fn check_trusted(&self, _: &[CertificateDer<'_>], _: Usage, _: UnixTime) -> Decision {
//!         Decision::reject(
//!             self.name(),
//!             kickstart_traits::rustls::Error::InvalidCertificate(
//!                 kickstart_traits::rustls::CertificateError::UnknownIssuer,
//!             ),
//!         )
//!     }
//! }
//! ```

use rustls_pki_types::{CertificateDer, UnixTime};
use std::fmt;
use std::sync::Arc;

/// Which side of the connection presented the chain being checked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Usage {
    /// The chain was presented by a client to us, acting as a server
    /// requiring mutual authentication.
    Client,
    /// The chain was presented by a server that we connected to.
    Server,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Server => "server",
        })
    }
}

/// Why one trust authority did not accept a chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Name of the rejecting [`TrustAuthority`].
    pub authority: String,
    /// What went wrong.
    pub error: rustls::Error,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.authority, self.error)
    }
}

/// Outcome of [`TrustAuthority::check_trusted`].
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// The chain is trusted.
    Accept,
    /// The chain is not trusted. Carries the reason given by every
    /// authority that was consulted, in the order they were consulted.
    Reject(Vec<Rejection>),
}

impl Decision {
    /// A rejection with a single reason.
    pub fn reject(authority: impl Into<String>, error: rustls::Error) -> Self {
        Self::Reject(vec![Rejection {
            authority: authority.into(),
            error,
        }])
    }

    /// True for [`Decision::Accept`].
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Rejection reasons. Empty for [`Decision::Accept`].
    pub fn reasons(&self) -> &[Rejection] {
        match self {
            Self::Accept => &[],
            Self::Reject(r) => r,
        }
    }
}

/// Something that can decide whether a presented certificate chain is
/// trusted.
///
/// Implementations are immutable once constructed and are shared between
/// threads behind an [`Arc`].
pub trait TrustAuthority: Send + Sync + fmt::Debug {
    /// Name used in logs and in [`Rejection`]s.
    fn name(&self) -> &str;

    /// The issuer certificates this authority accepts, without
    /// duplicates. An authority with no accepted issuers rejects every
    /// chain.
    fn accepted_issuers(&self) -> &[CertificateDer<'static>];

    /// Decide whether `chain` (end-entity certificate first, then any
    /// intermediates) is trusted for `usage` at time `now`.
    fn check_trusted(&self, chain: &[CertificateDer<'_>], usage: Usage, now: UnixTime)
    -> Decision;

    /// Authorities that are combinations of other authorities return
    /// their flattened delegates here so that they can be combined again
    /// without nesting.
    fn delegates(&self) -> Option<&[Arc<dyn TrustAuthority>]> {
        None
    }
}
