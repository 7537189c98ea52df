//! Read-only parameter snapshots with atomic refresh

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::record::{AgreementScenarioParameters, SchemeRules};
use crate::error::{CalcError, StoreError};

/// On-disk shape: agreement -> scenario -> record
pub type ParameterDocument = BTreeMap<String, BTreeMap<String, AgreementScenarioParameters>>;

const BUNDLED_PARAMETERS: &str = include_str!("../../data/calculation_parameters.json");

/// A scenario whose record has been validated into a rule set
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    pub agreement: String,
    pub scenario: String,
    /// Record as published, including pass-through fields
    pub parameters: AgreementScenarioParameters,
    pub rules: SchemeRules,
}

/// Immutable set of agreements, validated on construction
#[derive(Debug, Clone)]
pub struct ParameterSnapshot {
    agreements: BTreeMap<String, BTreeMap<String, Arc<ResolvedScenario>>>,
    loaded_at: DateTime<Utc>,
}

impl ParameterSnapshot {
    /// Validate every record; any invalid scenario rejects the whole document
    pub fn from_document(document: ParameterDocument) -> Result<Self, StoreError> {
        let mut agreements = BTreeMap::new();

        for (agreement, scenarios) in document {
            let mut resolved = BTreeMap::new();
            for (scenario, parameters) in scenarios {
                let rules = parameters.to_rules().map_err(|reason| StoreError::InvalidScenario {
                    agreement: agreement.clone(),
                    scenario: scenario.clone(),
                    reason,
                })?;
                resolved.insert(
                    scenario.clone(),
                    Arc::new(ResolvedScenario {
                        agreement: agreement.clone(),
                        scenario,
                        parameters,
                        rules,
                    }),
                );
            }
            if resolved.is_empty() {
                warn!("Agreement {agreement} has no scenarios");
            }
            agreements.insert(agreement, resolved);
        }

        Ok(Self {
            agreements,
            loaded_at: Utc::now(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let document: ParameterDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let snapshot = Self::from_json_str(&json)?;
        info!(
            "Loaded {} agreements from {}",
            snapshot.agreements.len(),
            path.as_ref().display()
        );
        Ok(snapshot)
    }

    /// Parameters shipped with the crate (ITP1, SAF-LO, PA16)
    pub fn bundled() -> Result<Self, StoreError> {
        Self::from_json_str(BUNDLED_PARAMETERS)
    }

    /// Look up a scenario; names match case-insensitively
    pub fn resolve(&self, agreement: &str, scenario: &str) -> Result<Arc<ResolvedScenario>, CalcError> {
        let scenarios = lookup(&self.agreements, agreement).ok_or_else(|| CalcError::UnknownAgreement {
            agreement: agreement.to_string(),
        })?;
        lookup(scenarios, scenario)
            .cloned()
            .ok_or_else(|| CalcError::UnknownScenario {
                agreement: agreement.to_string(),
                scenario: scenario.to_string(),
            })
    }

    pub fn agreements(&self) -> impl Iterator<Item = &str> {
        self.agreements.keys().map(String::as_str)
    }

    pub fn scenarios(&self, agreement: &str) -> Option<Vec<&str>> {
        lookup(&self.agreements, agreement).map(|s| s.keys().map(String::as_str).collect())
    }

    /// Canonical agreement name for a case-insensitive match
    pub fn canonical_agreement(&self, agreement: &str) -> Option<&str> {
        self.agreements
            .keys()
            .find(|k| k.eq_ignore_ascii_case(agreement))
            .map(String::as_str)
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Back to the on-disk shape, pass-through fields included
    pub fn to_document(&self) -> ParameterDocument {
        self.agreements
            .iter()
            .map(|(agreement, scenarios)| {
                let records = scenarios
                    .iter()
                    .map(|(name, resolved)| (name.clone(), resolved.parameters.clone()))
                    .collect();
                (agreement.clone(), records)
            })
            .collect()
    }
}

fn lookup<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

/// Shared parameter store
///
/// Readers take an `Arc` to the current snapshot and release the lock
/// immediately; `refresh` replaces the snapshot as a whole so a reader sees
/// either the old set or the new one, never a mix.
pub struct ParameterStore {
    current: RwLock<Arc<ParameterSnapshot>>,
}

impl ParameterStore {
    pub fn new(snapshot: ParameterSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn bundled() -> Result<Self, StoreError> {
        Ok(Self::new(ParameterSnapshot::bundled()?))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(ParameterSnapshot::from_path(path)?))
    }

    pub fn snapshot(&self) -> Arc<ParameterSnapshot> {
        self.current.read().clone()
    }

    pub fn resolve(&self, agreement: &str, scenario: &str) -> Result<Arc<ResolvedScenario>, CalcError> {
        self.snapshot().resolve(agreement, scenario)
    }

    /// Swap in a new snapshot
    pub fn refresh(&self, snapshot: ParameterSnapshot) {
        let agreements = snapshot.agreements.len();
        *self.current.write() = Arc::new(snapshot);
        info!("Parameter store refreshed ({agreements} agreements)");
    }

    /// Reload from a file; on failure the current snapshot stays in place
    pub fn reload_from_path<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        match ParameterSnapshot::from_path(path) {
            Ok(snapshot) => {
                self.refresh(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!("Parameter reload failed, keeping previous snapshot: {e}");
                Err(e)
            }
        }
    }
}
