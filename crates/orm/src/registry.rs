use std::collections::HashMap;
use std::sync::Arc;

use crate::dao::Dao;
use crate::error::{Error, Result};

/// Resolves logical entity names and storage table names to DAOs.
#[derive(Clone, Debug, Default)]
pub struct DaoRegistry {
    daos: HashMap<String, Arc<Dao>>,
    tables: HashMap<String, String>,
}

impl DaoRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dao` under its entity name and table, replacing any earlier
    /// registration.
    pub fn register(&mut self, dao: Dao) -> Arc<Dao> {
        let dao = Arc::new(dao);
        let name = dao.entity().name().to_string();
        self.tables.insert(dao.entity().table().to_string(), name.clone());
        self.daos.insert(name, Arc::clone(&dao));
        dao
    }

    /// Builder-style [`DaoRegistry::register`].
    #[must_use]
    pub fn with(mut self, dao: Dao) -> Self {
        self.register(dao);
        self
    }

    /// The DAO registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] when nothing is registered as `name`.
    pub fn get(&self, name: &str) -> Result<Arc<Dao>> {
        self.daos.get(name).map(Arc::clone).ok_or_else(|| Error::UnknownEntity {
            name: name.to_string(),
        })
    }

    /// The DAO serving storage table `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] when no registered entity uses
    /// `table`.
    pub fn by_table(&self, table: &str) -> Result<Arc<Dao>> {
        self.tables.get(table).map_or_else(
            || {
                Err(Error::UnknownEntity {
                    name: table.to_string(),
                })
            },
            |name| self.get(name),
        )
    }
}
