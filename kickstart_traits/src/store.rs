//! The store abstraction: a named, in-memory collection of trusted
//! certificates and private keys, keyed by alias.
//!
//! Stores are produced by a [`StoreLoader`]. Implementors of
//! [`StoreLoader`] look like this:
//!
//! ```
//! use kickstart_traits::store::{Store, StoreError, StoreLoader, StorePassword, StoreSource};
//!
//! struct NothingLoader;
//!
//! impl StoreLoader for NothingLoader {
//!     fn load(&self, source: &StoreSource, _: &StorePassword) -> Result<Store, StoreError> {
//!         Err(StoreError::Parse(source.to_string(), "nothing to see here".into()))
//!     }
//! }
//! ```

use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroizing;

/// Where the contents of a [`Store`] come from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreSource {
    /// A file on disk.
    Path(PathBuf),
    /// Bytes already in memory. The name is used in diagnostics only.
    Bytes {
        /// Human readable name for the material.
        name: String,
        /// Raw store contents.
        data: Vec<u8>,
    },
}

impl StoreSource {
    /// Convenience constructor for [`StoreSource::Bytes`].
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// True if the source does not identify any material at all: an
    /// empty path or an empty byte buffer.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path(p) => p.as_os_str().is_empty(),
            Self::Bytes { data, .. } => data.is_empty(),
        }
    }
}

impl fmt::Display for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Bytes { name, .. } => f.write_str(name),
        }
    }
}

impl From<PathBuf> for StoreSource {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for StoreSource {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<&str> for StoreSource {
    fn from(p: &str) -> Self {
        Self::Path(p.into())
    }
}

impl From<String> for StoreSource {
    fn from(p: String) -> Self {
        Self::Path(p.into())
    }
}

/// Password granting access to a [`Store`]. The contents are wiped from
/// memory on drop and never printed.
#[derive(Clone, Default)]
pub struct StorePassword(Zeroizing<String>);

impl StorePassword {
    /// Wrap a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    /// True for the empty password.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The password itself, for loaders that need it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StorePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StorePassword(***)")
    }
}

impl From<&str> for StorePassword {
    fn from(p: &str) -> Self {
        Self::new(p)
    }
}

impl From<String> for StorePassword {
    fn from(p: String) -> Self {
        Self::new(p)
    }
}

/// One aliased item in a [`Store`].
#[derive(Debug)] // OK to have: PrivateKeyDer's Debug elides the key.
pub enum StoreEntry {
    /// A certificate to be used as a trust anchor.
    TrustedCertificate(CertificateDer<'static>),
    /// A private key with the certificate chain that belongs to it,
    /// end-entity certificate first.
    PrivateKey {
        /// The key.
        key: PrivateKeyDer<'static>,
        /// The certificate chain for the key.
        chain: Vec<CertificateDer<'static>>,
    },
}

/// A loaded set of certificates and private keys, keyed by alias.
/// Insertion order is preserved.
#[derive(Debug)]
pub struct Store {
    name: String,
    entries: Vec<(String, StoreEntry)>,
}

impl Store {
    /// An empty store. The name is used in diagnostics only.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an entry, replacing any existing entry with the same alias.
    pub fn insert(&mut self, alias: impl Into<String>, entry: StoreEntry) {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((alias, entry)),
        }
    }

    /// Look up an entry by alias.
    pub fn get(&self, alias: &str) -> Option<&StoreEntry> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, e)| e)
    }

    /// True if an entry with this alias exists.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All aliases in insertion order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(a, _)| a.as_str())
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &StoreEntry)> {
        self.entries.iter().map(|(a, e)| (a.as_str(), e))
    }

    /// The trusted certificate entries.
    pub fn trusted_certificates(&self) -> impl Iterator<Item = &CertificateDer<'static>> {
        self.entries.iter().filter_map(|(_, e)| match e {
            StoreEntry::TrustedCertificate(c) => Some(c),
            StoreEntry::PrivateKey { .. } => None,
        })
    }

    /// The private key entries as `(alias, key, chain)`.
    pub fn private_keys(
        &self,
    ) -> impl Iterator<Item = (&str, &PrivateKeyDer<'static>, &[CertificateDer<'static>])> {
        self.entries.iter().filter_map(|(a, e)| match e {
            StoreEntry::PrivateKey { key, chain } => Some((a.as_str(), key, chain.as_slice())),
            StoreEntry::TrustedCertificate(_) => None,
        })
    }
}

/// Error type returned by [`StoreLoader`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The source does not exist.
    #[error("store {0} not found: {1}")]
    NotFound(String, #[source] std::io::Error),
    /// The source exists but its contents are not a usable store.
    #[error("store {0} could not be parsed: {1}")]
    Parse(String, String),
    /// Any other failure reading the source.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Loads a [`Store`] from a [`StoreSource`].
pub trait StoreLoader: Send + Sync {
    /// Read and parse the store. Loading is synchronous and may block on
    /// I/O.
    fn load(&self, source: &StoreSource, password: &StorePassword) -> Result<Store, StoreError>;
}
