mod parser;
mod pattern;
mod render;
mod spec;
#[cfg(test)]
mod tests;

pub use parser::*;
pub use pattern::*;
pub use render::*;
pub use spec::*;
