//! Combining independently sourced trust authorities into one.
//!
//! A [`CompositeTrustAuthority`] trusts a chain if any of its delegates
//! trusts it. Its accepted issuers are the union of its delegates'
//! accepted issuers with duplicates (by DER encoding) removed, in the
//! order they were first seen.
//!
//! Combining composites flattens them: the result never nests, and
//! combining the same authorities again does not change the issuer set.
//! Delegates themselves are kept as given, so
//! `combine([combine([a, b]), a, b])` has four delegates but the same two
//! issuers as `combine([a, b])`.

use kickstart_traits::trust::{Decision, TrustAuthority, Usage};
use rustls_pki_types::{CertificateDer, UnixTime};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by [`combine`] when given nothing to combine.
#[derive(Debug, Error)]
#[error("no trust authorities supplied")]
pub struct AggregationError;

/// A [`TrustAuthority`] with OR semantics over its delegates.
#[derive(Debug)]
pub struct CompositeTrustAuthority {
    name: String,
    delegates: Vec<Arc<dyn TrustAuthority>>,
    issuers: Vec<CertificateDer<'static>>,
}

fn flatten_into(authority: Arc<dyn TrustAuthority>, out: &mut Vec<Arc<dyn TrustAuthority>>) {
    if let Some(delegates) = authority.delegates() {
        for d in delegates {
            flatten_into(Arc::clone(d), out);
        }
        return;
    }
    out.push(authority);
}

/// Combine `authorities` into a single [`CompositeTrustAuthority`].
pub fn combine(
    authorities: impl IntoIterator<Item = Arc<dyn TrustAuthority>>,
) -> Result<CompositeTrustAuthority, AggregationError> {
    let mut delegates = Vec::new();
    for a in authorities {
        flatten_into(a, &mut delegates);
    }
    if delegates.is_empty() {
        return Err(AggregationError);
    }

    let mut seen: HashSet<&[u8]> = HashSet::new();
    let mut issuers = Vec::new();
    for d in &delegates {
        for issuer in d.accepted_issuers() {
            if seen.insert(issuer.as_ref()) {
                issuers.push(issuer.clone());
            }
        }
    }
    let name = format!(
        "composite[{}]",
        delegates
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::info!(
        "Combined {} trust authorities with {} distinct issuers",
        delegates.len(),
        issuers.len()
    );
    Ok(CompositeTrustAuthority {
        name,
        delegates,
        issuers,
    })
}

impl CompositeTrustAuthority {
    /// Number of (flattened) delegates.
    pub fn delegate_count(&self) -> usize {
        self.delegates.len()
    }
}

impl TrustAuthority for CompositeTrustAuthority {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted_issuers(&self) -> &[CertificateDer<'static>] {
        &self.issuers
    }

    fn check_trusted(&self, chain: &[CertificateDer<'_>], usage: Usage, now: UnixTime) -> Decision {
        let mut reasons = Vec::new();
        for d in &self.delegates {
            match d.check_trusted(chain, usage, now) {
                Decision::Accept => return Decision::Accept,
                Decision::Reject(r) => reasons.extend(r),
            }
        }
        log::debug!(
            "No delegate of {} trusts the {} chain ({} reasons)",
            self.name,
            usage,
            reasons.len()
        );
        Decision::Reject(reasons)
    }

    fn delegates(&self) -> Option<&[Arc<dyn TrustAuthority>]> {
        Some(&self.delegates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use crate::trust::StoreTrustAuthority;
    use rustls::CertificateError;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FixedAuthority {
        name: &'static str,
        issuers: Vec<CertificateDer<'static>>,
        accept: bool,
        calls: Mutex<usize>,
    }

    impl FixedAuthority {
        fn new(name: &'static str, issuers: &[u8], accept: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                issuers: testdata::certs(issuers),
                accept,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl TrustAuthority for FixedAuthority {
        fn name(&self) -> &str {
            self.name
        }

        fn accepted_issuers(&self) -> &[CertificateDer<'static>] {
            &self.issuers
        }

        fn check_trusted(&self, _: &[CertificateDer<'_>], _: Usage, _: UnixTime) -> Decision {
            *self.calls.lock().unwrap() += 1;
            if self.accept {
                Decision::Accept
            } else {
                Decision::reject(
                    self.name,
                    rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer),
                )
            }
        }
    }

    fn store_authority(name: &str, pem: &[u8]) -> Arc<dyn TrustAuthority> {
        Arc::new(
            StoreTrustAuthority::from_certificates(
                name,
                testdata::certs(pem),
                &testdata::provider(),
            )
            .expect("authority"),
        )
    }

    #[test]
    fn empty() {
        let err = combine(Vec::<Arc<dyn TrustAuthority>>::new()).expect_err("nothing to combine");
        assert_eq!(err.to_string(), "no trust authorities supplied");
    }

    #[test]
    fn issuer_count_is_distinct_issuers() {
        let a = store_authority("a", testdata::CACERT);
        let b = store_authority("b", testdata::OTHER_CACERT);
        let c = store_authority("c", testdata::CACERT);
        let combined = combine([a, b, c]).expect("combined");
        assert_eq!(combined.delegate_count(), 3);
        assert_eq!(
            combined.accepted_issuers(),
            [
                testdata::certs(testdata::CACERT),
                testdata::certs(testdata::OTHER_CACERT)
            ]
            .concat()
            .as_slice()
        );
    }

    #[test]
    fn idempotent() {
        let a = store_authority("a", testdata::CACERT);
        let b = store_authority("b", testdata::OTHER_CACERT);
        let ab = combine([Arc::clone(&a), Arc::clone(&b)]).expect("ab");
        let ab_issuers = ab.accepted_issuers().to_vec();
        let again = combine([Arc::new(ab) as Arc<dyn TrustAuthority>, a, b]).expect("again");
        assert_eq!(again.delegate_count(), 4);
        assert_eq!(again.accepted_issuers(), ab_issuers.as_slice());
        assert!(
            again
                .delegates()
                .unwrap()
                .iter()
                .all(|d| d.delegates().is_none())
        );
    }

    #[test]
    fn or_trust() {
        let chain = testdata::certs(testdata::SERVER_CERT);
        let no = FixedAuthority::new("no", testdata::OTHER_CACERT, false);
        let yes = FixedAuthority::new("yes", testdata::CACERT, true);
        let combined = combine([
            Arc::clone(&no) as Arc<dyn TrustAuthority>,
            Arc::clone(&yes) as Arc<dyn TrustAuthority>,
        ])
        .expect("combined");
        assert!(
            combined
                .check_trusted(&chain, Usage::Server, testdata::now())
                .is_accept()
        );
        assert_eq!(no.calls(), 1);
        assert_eq!(yes.calls(), 1);
    }

    #[test]
    fn stops_at_first_accept() {
        let chain = testdata::certs(testdata::SERVER_CERT);
        let yes = FixedAuthority::new("yes", testdata::CACERT, true);
        let no = FixedAuthority::new("no", testdata::OTHER_CACERT, false);
        let combined = combine([
            Arc::clone(&yes) as Arc<dyn TrustAuthority>,
            Arc::clone(&no) as Arc<dyn TrustAuthority>,
        ])
        .expect("combined");
        assert!(
            combined
                .check_trusted(&chain, Usage::Client, testdata::now())
                .is_accept()
        );
        assert_eq!(no.calls(), 0);
    }

    #[test]
    fn all_reasons_in_order() {
        let chain = testdata::certs(testdata::SERVER_CERT);
        let first = FixedAuthority::new("first", testdata::CACERT, false);
        let second = FixedAuthority::new("second", testdata::OTHER_CACERT, false);
        let combined = combine([
            first as Arc<dyn TrustAuthority>,
            second as Arc<dyn TrustAuthority>,
        ])
        .expect("combined");
        let d = combined.check_trusted(&chain, Usage::Server, testdata::now());
        assert_eq!(
            d.reasons()
                .iter()
                .map(|r| r.authority.as_str())
                .collect::<Vec<_>>(),
            ["first", "second"]
        );
    }

    #[test]
    fn real_chains() {
        let combined = combine([
            store_authority("corp", testdata::CACERT),
            store_authority("partner", testdata::OTHER_CACERT),
        ])
        .expect("combined");
        for pem in [testdata::SERVER_CERT, testdata::STRANGER_CERT] {
            let chain = testdata::certs(pem);
            assert!(
                combined
                    .check_trusted(&chain, Usage::Server, testdata::now())
                    .is_accept()
            );
        }

        let corp_only = combine([store_authority("corp", testdata::CACERT)]).expect("corp");
        let chain = testdata::certs(testdata::STRANGER_CERT);
        let d = corp_only.check_trusted(&chain, Usage::Server, testdata::now());
        assert_eq!(d.reasons().len(), 1);
        assert_eq!(d.reasons()[0].authority, "corp");
    }
}
