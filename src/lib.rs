//! Occupational pension calculator for Swedish collective agreements
//!
//! Projects monthly pension, accumulated capital and contributions for a
//! person under a named (agreement, scenario) pair, and compares two
//! scenarios side by side. Two formula kinds are supported:
//!
//! - contribution-based (premiebestämd): annual contributions split at the
//!   income cap, compounded to retirement, paid out over a fixed horizon
//! - benefit-based (förmånsbestämd): a bracketed share of final salary
//!   chosen by years of service
//!
//! Scenario parameters live in a read-only [`ParameterStore`] that can be
//! swapped atomically while calculations are running.

pub mod api;
pub mod batch;
pub mod calculator;
pub mod compare;
pub mod error;
pub mod explain;
pub mod extract;
pub mod history;
pub mod input;
pub mod params;
pub mod policy;
pub mod projection;
pub mod result;

pub use calculator::Calculator;
pub use compare::{Comparator, ComparisonResult, ScenarioRef};
pub use error::{CalcError, ComparisonError, ErrorResponse, StoreError};
pub use input::{CalculationInput, Field};
pub use params::{ParameterSnapshot, ParameterStore, SchemeKind};
pub use policy::{CalculationPolicy, CompoundingConvention};
pub use result::{CalculationResult, Warning};
