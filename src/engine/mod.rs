//! Pure loyalty and segmentation logic. Nothing in here touches the store;
//! services load rows and hand them to these functions.

pub mod accrual;
pub mod metrics;
pub mod plan_templates;
pub mod segment_rules;
pub mod segment_templates;
pub mod tier_table;

pub use accrual::*;
pub use metrics::*;
pub use plan_templates::*;
pub use segment_rules::*;
pub use segment_templates::*;
pub use tier_table::*;
