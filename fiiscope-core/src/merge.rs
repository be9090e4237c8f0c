//! Merge engine: trust-ordered, gap-driven provider consultation.
//!
//! Providers are consulted one at a time in trust order. Each is asked only for
//! the fields still unfilled, and a value written by a more trusted provider is
//! never overwritten. Consultation stops as soon as every requested field is
//! filled; providers after that point are never called.
//!
//! The run is a small state machine:
//! NotStarted → PartiallyFilled → FullyFilled | Exhausted.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::data::provider::{ProviderId, SourceAdapter, TrustOrder};
use crate::domain::{CanonicalRecord, FieldName, Ticker};

/// Progress of one resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    NotStarted,
    PartiallyFilled { remaining: usize },
    /// Every requested field holds a value. Terminal.
    FullyFilled,
    /// Providers ran out with fields still unfilled. Terminal; not an error.
    Exhausted { remaining: usize },
}

impl MergeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeState::FullyFilled | MergeState::Exhausted { .. })
    }

    /// State after a provider contributed (or failed to).
    fn after_contribution(record: &CanonicalRecord) -> Self {
        match record.unfilled().len() {
            0 => MergeState::FullyFilled,
            remaining => MergeState::PartiallyFilled { remaining },
        }
    }

    /// Close a run whose trust order was fully walked.
    fn finish(self) -> Self {
        match self {
            MergeState::PartiallyFilled { remaining } => MergeState::Exhausted { remaining },
            other => other,
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeState::NotStarted => write!(f, "not-started"),
            MergeState::PartiallyFilled { remaining } => {
                write!(f, "partially-filled ({remaining} left)")
            }
            MergeState::FullyFilled => write!(f, "fully-filled"),
            MergeState::Exhausted { remaining } => write!(f, "exhausted ({remaining} unfilled)"),
        }
    }
}

/// Result of a resolve call: the record plus where each value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub record: CanonicalRecord,
    pub state: MergeState,
    /// Provider that supplied each filled field.
    pub provenance: BTreeMap<FieldName, ProviderId>,
    /// Providers actually called, in call order.
    pub consulted: Vec<ProviderId>,
    /// Providers whose document could not be retrieved, with the reason.
    pub failures: Vec<(ProviderId, String)>,
}

/// Drives source adapters in trust order to build one canonical record.
pub struct MergeEngine {
    adapters: BTreeMap<ProviderId, Arc<dyn SourceAdapter>>,
}

impl MergeEngine {
    pub fn new(adapters: BTreeMap<ProviderId, Arc<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.adapters.keys().copied()
    }

    /// Resolve `fields` for `ticker`, consulting providers in `trust_order`.
    ///
    /// Never fails. Fields no provider could fill stay `None` in the record.
    pub fn resolve(
        &self,
        ticker: &Ticker,
        fields: &[FieldName],
        trust_order: &TrustOrder,
    ) -> MergeOutcome {
        let mut record = CanonicalRecord::empty(fields);
        let mut provenance = BTreeMap::new();
        let mut consulted = Vec::new();
        let mut failures = Vec::new();

        let mut state = MergeState::NotStarted;
        if record.is_complete() {
            // Nothing requested, nothing to ask anyone.
            state = MergeState::FullyFilled;
        }

        for &provider in trust_order.providers() {
            if state.is_terminal() {
                break;
            }

            let Some(adapter) = self.adapters.get(&provider) else {
                tracing::warn!(%ticker, %provider, "no adapter registered; skipping");
                continue;
            };

            let wanted = record.unfilled();
            consulted.push(provider);
            let contribution = adapter.contribute(ticker, &wanted);

            if let Some(reason) = contribution.fetch_error {
                failures.push((provider, reason));
            }
            for (field, value) in contribution.values {
                if record.fill(field, value) {
                    provenance.insert(field, provider);
                }
            }

            let next = MergeState::after_contribution(&record);
            tracing::debug!(%ticker, %provider, from = %state, to = %next, "merge transition");
            state = next;
        }

        let state = state.finish();
        if let MergeState::Exhausted { remaining } = state {
            tracing::debug!(%ticker, remaining, "providers exhausted");
        }

        MergeOutcome {
            record,
            state,
            provenance,
            consulted,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{Extractor, FetchError, FieldTable};
    use crate::domain::FieldValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned provider: a fixed document of `field=value` lines.
    struct Canned {
        id: ProviderId,
        doc: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    fn lookup(doc: &str, key: &str) -> Option<FieldValue> {
        doc.lines()
            .find_map(|l| l.strip_prefix(key)?.strip_prefix('='))
            .map(|v| FieldValue::Text(v.to_string()))
    }

    impl FieldTable for Canned {
        type Document = &'static str;

        fn id(&self) -> ProviderId {
            self.id
        }

        fn fetch(&self, _: &Ticker, _: &[FieldName]) -> Result<&'static str, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.doc.ok_or_else(|| FetchError::NetworkUnreachable("offline".into()))
        }

        fn extractor(&self, field: FieldName) -> Option<Extractor<&'static str>> {
            match field {
                FieldName::Name => Some(|d| lookup(d, "name")),
                FieldName::Segment => Some(|d| lookup(d, "segment")),
                _ => None,
            }
        }
    }

    fn engine(
        providers: Vec<(ProviderId, Option<&'static str>)>,
    ) -> (MergeEngine, Vec<Arc<AtomicUsize>>) {
        let mut adapters: BTreeMap<ProviderId, Arc<dyn SourceAdapter>> = BTreeMap::new();
        let mut counters = Vec::new();
        for (id, doc) in providers {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.push(calls.clone());
            adapters.insert(id, Arc::new(Canned { id, doc, calls }));
        }
        (MergeEngine::new(adapters), counters)
    }

    fn order(ids: &[ProviderId]) -> TrustOrder {
        TrustOrder::new(ids.to_vec()).unwrap()
    }

    #[test]
    fn empty_field_set_calls_nobody() {
        let (engine, calls) = engine(vec![(ProviderId::Fundamentus, Some("name=A"))]);
        let out = engine.resolve(&Ticker::new("X11").unwrap(), &[], &TrustOrder::default());
        assert_eq!(out.state, MergeState::FullyFilled);
        assert!(out.consulted.is_empty());
        assert_eq!(calls[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_provider_is_recorded_and_skipped() {
        let (engine, _) = engine(vec![
            (ProviderId::Fundamentus, None),
            (ProviderId::Fundsexplorer, Some("name=Beta")),
        ]);
        let out = engine.resolve(
            &Ticker::new("X11").unwrap(),
            &[FieldName::Name],
            &order(&[ProviderId::Fundamentus, ProviderId::Fundsexplorer]),
        );
        assert_eq!(out.record.get(FieldName::Name), Some(&FieldValue::Text("Beta".into())));
        assert_eq!(out.provenance[&FieldName::Name], ProviderId::Fundsexplorer);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].0, ProviderId::Fundamentus);
    }

    #[test]
    fn unfillable_field_exhausts_without_error() {
        let (engine, _) = engine(vec![(ProviderId::Investidor10, Some("name=Gamma"))]);
        let out = engine.resolve(
            &Ticker::new("X11").unwrap(),
            &[FieldName::Name, FieldName::Price],
            &order(&[ProviderId::Investidor10]),
        );
        assert_eq!(out.state, MergeState::Exhausted { remaining: 1 });
        assert!(out.record.contains(FieldName::Price));
        assert_eq!(out.record.get(FieldName::Price), None);
    }

    #[test]
    fn unregistered_provider_is_skipped() {
        let (engine, _) = engine(vec![(ProviderId::Fundsexplorer, Some("name=Delta"))]);
        let ticker = Ticker::new("X11").unwrap();
        let out = engine.resolve(&ticker, &[FieldName::Name], &TrustOrder::default());
        assert_eq!(out.consulted, vec![ProviderId::Fundsexplorer]);
        assert_eq!(out.state, MergeState::FullyFilled);
    }
}
