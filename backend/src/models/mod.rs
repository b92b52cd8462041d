pub mod coordinate;
pub mod method;
pub mod prayer;
pub mod time;

pub use coordinate::*;
pub use method::*;
pub use prayer::*;
pub use time::*;
