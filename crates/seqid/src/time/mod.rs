mod interface;
mod local_clock;

pub use interface::*;
pub use local_clock::*;
