//! Schema catalog for the live-data table.
//!
//! Declared column types are read from the database on every lookup unless a
//! TTL is configured, in which case the full map is reused until it expires.

use crate::db::{repo, Store};
use crate::error::{CatalogError, DbError};
use crate::model::{Field, TypeTag};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument};

pub type FieldTypes = BTreeMap<String, TypeTag>;

#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    store: Store,
    ttl: Duration,
    cached: Arc<Mutex<Option<(Instant, FieldTypes)>>>,
}

impl SchemaCatalog {
    /// A catalog that queries the database on every call.
    pub fn new(store: Store) -> Self {
        Self::with_ttl(store, Duration::ZERO)
    }

    pub fn with_ttl(store: Store, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Declared types of `live_data` columns, keyed by column name.
    /// Narrowed to one column when `column` is given; an absent column
    /// yields an empty map.
    #[instrument(skip_all)]
    pub async fn field_types(&self, column: Option<&str>) -> Result<FieldTypes, CatalogError> {
        if let Some(all) = self.cached_types() {
            return Ok(match column {
                Some(c) => all.into_iter().filter(|(name, _)| name == c).collect(),
                None => all,
            });
        }

        let fetch_all = column.is_none() || !self.ttl.is_zero();
        let raw = repo::live_data_column_types(
            &self.store,
            if fetch_all { None } else { column },
        )
        .await?;
        let mut types = FieldTypes::new();
        for (name, db_type) in raw {
            let Some(tag) = TypeTag::from_db_type(&db_type) else {
                error!(%name, %db_type, "unknown column type in live_data");
                return Err(CatalogError::UnknownType {
                    column: name,
                    db_type,
                });
            };
            types.insert(name, tag);
        }
        debug!(count = types.len(), "loaded live_data column types");

        if fetch_all && !self.ttl.is_zero() {
            self.store_cache(types.clone());
        }
        Ok(match column {
            Some(c) if fetch_all => types.into_iter().filter(|(name, _)| name == c).collect(),
            _ => types,
        })
    }

    /// Declared type of a single column, `None` if the column does not exist.
    pub async fn field_type(&self, column: &str) -> Result<Option<TypeTag>, CatalogError> {
        Ok(self.field_types(Some(column)).await?.remove(column))
    }

    /// The fixed list of fields served by the bulk endpoint.
    pub fn known_fields(&self) -> &'static [Field] {
        &Field::ALL
    }

    pub async fn robot_names(&self) -> Result<Vec<String>, DbError> {
        repo::robot_names(&self.store).await
    }

    fn cached_types(&self) -> Option<FieldTypes> {
        if self.ttl.is_zero() {
            return None;
        }
        let guard = self.cached.lock().ok()?;
        match guard.as_ref() {
            Some((at, types)) if at.elapsed() < self.ttl => Some(types.clone()),
            _ => None,
        }
    }

    fn store_cache(&self, types: FieldTypes) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some((Instant::now(), types));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreSettings;

    async fn setup_store() -> Store {
        let mut settings = StoreSettings::new("sqlite::memory:");
        settings.pool_size = 1;
        let store = Store::connect(&settings).await.unwrap();
        store.run_migrations().await.unwrap();
        store
    }

    #[tokio::test]
    async fn all_known_fields_have_declared_types() {
        let catalog = SchemaCatalog::new(setup_store().await);
        let types = catalog.field_types(None).await.unwrap();
        for field in Field::ALL {
            assert_eq!(types.get(field.column()), Some(&field.declared_type()), "{field}");
        }
        assert_eq!(types.get("name"), Some(&TypeTag::String));
    }

    #[tokio::test]
    async fn single_column_lookup() {
        let catalog = SchemaCatalog::new(setup_store().await);
        let types = catalog.field_types(Some("buttonPressed")).await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types["buttonPressed"], TypeTag::Boolean);
        assert_eq!(catalog.field_type("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_db_type_fails_fast() {
        let store = setup_store().await;
        store
            .update("ALTER TABLE live_data ADD COLUMN photo blob", &[])
            .await
            .unwrap();
        let catalog = SchemaCatalog::new(store);
        let err = catalog.field_types(None).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownType {
                column: "photo".into(),
                db_type: "blob".into()
            }
        );
        // Columns with known types still resolve when asked for directly.
        assert_eq!(catalog.field_type("battery").await.unwrap(), Some(TypeTag::Float));
    }

    #[tokio::test]
    async fn ttl_cache_serves_stale_schema_until_expiry() {
        let store = setup_store().await;
        let catalog = SchemaCatalog::with_ttl(store.clone(), Duration::from_secs(60));
        assert_eq!(catalog.field_type("extra").await.unwrap(), None);
        store
            .update("ALTER TABLE live_data ADD COLUMN extra int", &[])
            .await
            .unwrap();
        assert_eq!(catalog.field_type("extra").await.unwrap(), None);

        let fresh = SchemaCatalog::new(store);
        assert_eq!(fresh.field_type("extra").await.unwrap(), Some(TypeTag::Integer));
    }

    #[tokio::test]
    async fn ttl_cache_refreshes_after_expiry() {
        let store = setup_store().await;
        let catalog = SchemaCatalog::with_ttl(store.clone(), Duration::from_millis(50));
        assert_eq!(catalog.field_type("extra").await.unwrap(), None);
        store
            .update("ALTER TABLE live_data ADD COLUMN extra float", &[])
            .await
            .unwrap();
        assert_eq!(catalog.field_type("extra").await.unwrap(), None);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(catalog.field_type("extra").await.unwrap(), Some(TypeTag::Float));
    }
}
