//! Core data types shared by the segment, the normalizers and the agent.

pub mod running_stats;
pub mod space;
pub mod transition;

pub use running_stats::{RunningMeanStd, RunningScalarStats};
pub use space::Space;
pub use transition::{StepShape, TransitionStep};
