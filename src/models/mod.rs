pub mod action_plan;
pub mod loyalty;
pub mod segment;

pub use action_plan::*;
pub use loyalty::*;
pub use segment::*;
