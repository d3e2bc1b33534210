//! Application registrar — process-wide duplicate guard.
//!
//! One registry is shared by every conversation thread. Membership is keyed
//! by scheme id, and the membership check and the append happen under a
//! single lock acquisition, so two threads racing on the same scheme produce
//! exactly one record.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::errors::RegistrarError;
use crate::agent_core::state::Profile;

/// Status stamped on every new application.
pub const STATUS_SUBMITTED: &str = "submitted";

/// Default processing estimate, in days.
pub const DEFAULT_PROCESSING_DAYS: u32 = 15;

/// An issued application. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: String,
    pub scheme_id: String,
    pub profile: Profile,
    pub status: String,
    /// ISO 8601 submission timestamp.
    pub timestamp: String,
    pub estimated_processing_days: u32,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(ApplicationRecord),
    /// The scheme already has an application; nothing was created.
    AlreadyApplied { application_id: String },
}

#[derive(Debug, Default)]
struct Registry {
    /// Submission order.
    records: Vec<ApplicationRecord>,
    /// scheme id → index into `records`.
    by_scheme: HashMap<String, usize>,
}

/// Shared application registry.
#[derive(Debug)]
pub struct ApplicationRegistrar {
    inner: Mutex<Registry>,
    processing_days: u32,
}

impl Default for ApplicationRegistrar {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_DAYS)
    }
}

impl ApplicationRegistrar {
    pub fn new(processing_days: u32) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            processing_days,
        }
    }

    /// Atomically check for an existing application for `scheme_id` and,
    /// if none exists, issue a new record.
    pub fn submit(&self, scheme_id: &str, profile: &Profile) -> Result<SubmitOutcome, RegistrarError> {
        let mut registry = self.lock()?;

        if let Some(&idx) = registry.by_scheme.get(scheme_id) {
            let existing = &registry.records[idx];
            tracing::info!(
                scheme_id,
                application_id = %existing.application_id,
                "duplicate application blocked"
            );
            return Ok(SubmitOutcome::AlreadyApplied {
                application_id: existing.application_id.clone(),
            });
        }

        let now = chrono::Utc::now();
        let record = ApplicationRecord {
            application_id: new_application_id(now),
            scheme_id: scheme_id.to_string(),
            profile: profile.clone(),
            status: STATUS_SUBMITTED.to_string(),
            timestamp: now.to_rfc3339(),
            estimated_processing_days: self.processing_days,
        };

        let idx = registry.records.len();
        registry.records.push(record.clone());
        registry.by_scheme.insert(scheme_id.to_string(), idx);

        tracing::info!(
            scheme_id,
            application_id = %record.application_id,
            "application submitted"
        );

        Ok(SubmitOutcome::Submitted(record))
    }

    /// Whether any thread has applied for `scheme_id`.
    pub fn has_applied(&self, scheme_id: &str) -> Result<bool, RegistrarError> {
        Ok(self.lock()?.by_scheme.contains_key(scheme_id))
    }

    /// Look up an application by id.
    pub fn get_status(&self, application_id: &str) -> Result<Option<ApplicationRecord>, RegistrarError> {
        Ok(self
            .lock()?
            .records
            .iter()
            .find(|r| r.application_id == application_id)
            .cloned())
    }

    /// All applications, in submission order.
    pub fn list_applications(&self) -> Result<Vec<ApplicationRecord>, RegistrarError> {
        Ok(self.lock()?.records.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Registry>, RegistrarError> {
        self.inner.lock().map_err(|e| RegistrarError::LockPoisoned {
            reason: e.to_string(),
        })
    }
}

/// `APP_<yyyymmddHHMMSS>_<8 hex>`: sortable by time, unique within a second.
fn new_application_id(now: chrono::DateTime<chrono::Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("APP_{}_{}", now.format("%Y%m%d%H%M%S"), &suffix[..8])
}

// ─── Tests ──────────────────────────────────────────────────────────────────
