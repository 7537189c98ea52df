//! Agreement parameter records, bracket tables and the parameter store

mod levels;
mod record;
pub mod store;

pub use levels::{BenefitLevel, BenefitRules, YearsCondition, YearsOp};
pub use record::{AgreementScenarioParameters, ContributionRules, SchemeKind, SchemeRules};
pub use store::{ParameterDocument, ParameterSnapshot, ParameterStore, ResolvedScenario};
