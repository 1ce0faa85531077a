//! Database connections known to the engine.

use serde::{Deserialize, Serialize};

/// One named database connection (`{"alias": ..., "id": ...}` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub alias: String,
    pub id: String,
}

/// Alias → id mapping in the order the engine listed them.
///
/// Aliases are expected to be unique; on a duplicate the first entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseCatalog {
    entries: Vec<DatabaseConnection>,
}

impl DatabaseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection unless its alias is already present. Returns whether it was added.
    pub fn insert(&mut self, connection: DatabaseConnection) -> bool {
        if self.id_for(&connection.alias).is_some() {
            tracing::debug!(alias = %connection.alias, "duplicate database alias ignored");
            return false;
        }
        self.entries.push(connection);
        true
    }

    pub fn id_for(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.alias == alias)
            .map(|c| c.id.as_str())
    }

    /// Reverse lookup used to label the selected connection.
    pub fn alias_for(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.alias.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatabaseConnection> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DatabaseConnection> for DatabaseCatalog {
    fn from_iter<I: IntoIterator<Item = DatabaseConnection>>(iter: I) -> Self {
        let mut catalog = DatabaseCatalog::new();
        for connection in iter {
            catalog.insert(connection);
        }
        catalog
    }
}

/// Result of fetching the catalog. Keeps "the engine has no databases" apart
/// from "the listing could not be fetched".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFetch {
    Loaded(DatabaseCatalog),
    Unavailable { reason: String },
}

impl CatalogFetch {
    pub fn is_available(&self) -> bool {
        matches!(self, CatalogFetch::Loaded(_))
    }

    /// Collapse to a catalog; an unavailable listing becomes empty.
    pub fn into_catalog(self) -> DatabaseCatalog {
        match self {
            CatalogFetch::Loaded(catalog) => catalog,
            CatalogFetch::Unavailable { .. } => DatabaseCatalog::new(),
        }
    }
}
