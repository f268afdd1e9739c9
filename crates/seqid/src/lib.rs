#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod chunk;
mod error;
mod manager;
mod mutex;
mod state;
mod store;
mod time;

pub use crate::chunk::*;
pub use crate::error::*;
pub use crate::manager::*;
pub use crate::state::*;
pub use crate::store::*;
pub use crate::time::*;
