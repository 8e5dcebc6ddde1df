mod discovered;
mod interfaces;
pub mod memory;
mod origins;
pub(crate) mod row_helpers;
pub mod seeds;
mod store_catalog;
mod subnets;

pub use memory::MemoryStore;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with the default pool size
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== Origins ==========

    pub async fn get_origin(&self, id: &str) -> Result<Option<Origin>> {
        origins::OriginRepo::get(&self.pool, id).await
    }

    pub async fn create_origin(&self, id: &str, name: &str) -> Result<Origin> {
        origins::OriginRepo::create(&self.pool, id, name).await
    }

    // ========== Subnets ==========

    pub async fn list_subnets(&self) -> Result<Vec<Subnet>> {
        subnets::SubnetRepo::list(&self.pool).await
    }

    pub async fn create_subnet(&self, req: &CreateSubnetRequest) -> Result<Subnet> {
        subnets::SubnetRepo::create(&self.pool, req).await
    }

    // ========== Interfaces ==========

    pub async fn find_known_interface(&self, node_id: &str, name: &str) -> Result<Option<Interface>> {
        interfaces::InterfaceRepo::find_known(&self.pool, node_id, name).await
    }

    pub async fn create_interface(&self, req: &CreateInterfaceRequest) -> Result<Interface> {
        interfaces::InterfaceRepo::create_known(&self.pool, req).await
    }

    pub async fn list_unknown_interfaces(&self) -> Result<Vec<Interface>> {
        interfaces::InterfaceRepo::list_unknown(&self.pool).await
    }

    // ========== Discovered addresses ==========

    pub async fn list_discovered_addresses(&self) -> Result<Vec<DiscoveredAddress>> {
        discovered::DiscoveredAddressRepo::list(&self.pool).await
    }

    pub async fn list_discovered_addresses_by_subnet(&self, subnet_id: i64) -> Result<Vec<DiscoveredAddress>> {
        discovered::DiscoveredAddressRepo::list_by_subnet(&self.pool, subnet_id).await
    }
}
