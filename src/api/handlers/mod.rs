pub mod learning;
pub mod workflow;

pub use learning::*;
pub use workflow::*;
