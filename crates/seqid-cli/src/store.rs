use core::ops::ControlFlow;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use parking_lot::RwLock;
use seqid::{BackingStore, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Column {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    ids: BTreeSet<i64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    texts: BTreeSet<String>,
}

type Tables = BTreeMap<String, BTreeMap<String, Column>>;

/// A [`BackingStore`] kept in a pretty-printed JSON file.
///
/// The whole file is read on open and written back by [`JsonStore::save`].
/// Values recorded in between are visible to forced reads immediately.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl JsonStore {
    /// Loads `path`, or starts empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let tables = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse store `{}`", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "store file not found, starting empty");
                Tables::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read store `{}`", path.display()));
            }
        };
        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_id(&self, table: &str, column: &str, value: i64) {
        self.column_mut(table, column, |c| {
            c.ids.insert(value);
        });
    }

    pub fn record_text(&self, table: &str, column: &str, value: String) {
        self.column_mut(table, column, |c| {
            c.texts.insert(value);
        });
    }

    fn column_mut(&self, table: &str, column: &str, f: impl FnOnce(&mut Column)) {
        let mut tables = self.tables.write();
        f(tables
            .entry(table.to_owned())
            .or_default()
            .entry(column.to_owned())
            .or_default());
    }

    /// Writes every recorded value back to the file.
    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(&*self.tables.read())?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write store `{}`", self.path.display()))
    }

    fn with_column<R>(
        &self,
        table: &str,
        column: &str,
        f: impl FnOnce(&Column) -> Option<R>,
    ) -> Option<R> {
        self.tables
            .read()
            .get(table)
            .and_then(|t| t.get(column))
            .and_then(f)
    }
}

impl BackingStore for JsonStore {
    fn read_current_max(&self, table: &str, column: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.with_column(table, column, |c| c.ids.last().copied()))
    }

    fn scan_prefix(
        &self,
        table: &str,
        column: &str,
        prefix: &str,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        let mut texts = self
            .with_column(table, column, |c| {
                Some(
                    c.texts
                        .iter()
                        .filter(|t| t.starts_with(prefix))
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            })
            .unwrap_or_default();
        texts.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));
        for text in &texts {
            if visit(text).is_break() {
                break;
            }
        }
        Ok(())
    }
}
