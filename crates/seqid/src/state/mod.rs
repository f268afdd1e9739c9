mod id;
mod key;
mod registry;
mod sno;

pub use id::*;
pub use key::*;
pub use sno::*;
