//! Schemes — the benefit dataset and the two tools the executor calls.
//!
//! Submodules:
//! - `dataset`: Scheme records, loaded once, shared read-only
//! - `eligibility`: Pure (profile, dataset) → eligible/ineligible partition
//! - `registrar`: Process-wide application registry with duplicate guard
//! - `errors`: Dataset and registrar error types

pub mod dataset;
pub mod eligibility;
pub mod errors;
pub mod registrar;

pub use dataset::{DatasetSource, EligibilityCriteria, Scheme, SchemeDataset};
pub use eligibility::{check_eligibility, EligibilityReport, SchemeMatch};
pub use errors::{RegistrarError, SchemeError};
pub use registrar::{ApplicationRecord, ApplicationRegistrar, SubmitOutcome};
