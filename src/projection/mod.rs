//! Projection engines for the two pension formulas

mod benefit;
mod contribution;

pub use benefit::{BenefitProjection, BenefitProjector};
pub use contribution::{
    accumulate, AccumulationYear, ContributionBreakdown, ContributionProjection, ContributionProjector,
    SalaryExchange,
};
