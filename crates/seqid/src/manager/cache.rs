use std::{collections::HashMap, sync::Arc};

use crate::{
    chunk::{ChunkSpec, parse},
    error::Result,
    mutex::{RwLock, read_lock, write_lock},
};

/// Parsed specs keyed by their exact format string.
///
/// Format strings are canonical byte-for-byte, so equal strings always parse
/// to equal specs and the parse can be shared.
#[derive(Default)]
pub(crate) struct SpecCache {
    specs: RwLock<HashMap<String, Arc<ChunkSpec>>>,
}

impl SpecCache {
    pub(crate) fn resolve(&self, format: &str) -> Result<Arc<ChunkSpec>> {
        if let Some(spec) = read_lock!(self.specs).get(format) {
            return Ok(Arc::clone(spec));
        }

        let spec = Arc::new(parse(format)?);
        let mut specs = write_lock!(self.specs);
        Ok(Arc::clone(
            specs.entry(format.to_owned()).or_insert(spec),
        ))
    }
}
