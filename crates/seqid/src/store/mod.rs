mod interface;
mod memory;

pub use interface::*;
pub use memory::*;
