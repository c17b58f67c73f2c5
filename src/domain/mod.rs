pub mod accuracy;
pub mod prediction;
pub mod projection;
pub mod sport;

pub use accuracy::*;
pub use prediction::*;
pub use projection::*;
pub use sport::*;
