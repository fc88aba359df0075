pub mod candidate;
pub mod observation;
pub mod schedule;

pub use candidate::*;
pub use observation::*;
pub use schedule::*;
