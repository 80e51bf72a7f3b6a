pub mod loan;
pub mod optimizer;
pub mod simulation;
