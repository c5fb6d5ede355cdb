pub mod aggregation;
pub mod plot;
