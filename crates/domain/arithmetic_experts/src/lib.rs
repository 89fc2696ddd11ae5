//! Domain experts for word-problem arithmetic: plain chains, entity
//! tracking, percentages, rate equations, and comparisons.

pub mod arithmetic;
pub mod comparison;
pub mod entity_track;
pub mod percentage;
pub mod rate_equation;

pub use arithmetic::ArithmeticExpert;
pub use comparison::ComparisonExpert;
pub use entity_track::EntityTrackExpert;
pub use percentage::PercentageExpert;
pub use rate_equation::RateEquationExpert;

use trace_solver::ExpertRegistry;

/// Register every arithmetic-family expert.
pub fn register_all(registry: &mut ExpertRegistry) {
    registry.register(Box::new(ArithmeticExpert));
    registry.register(Box::new(EntityTrackExpert));
    registry.register(Box::new(PercentageExpert));
    registry.register(Box::new(RateEquationExpert));
    registry.register(Box::new(ComparisonExpert));
}
