//! # Database Pool Management
//!
//! Row-level tenant isolation: a single shared PostgreSQL pool, with every
//! repository query carrying a `tenant_id = $N` predicate against the
//! tenant's own rows. This replaces an earlier schema-per-tenant design
//! (one `PgPool` per tenant schema, `SET search_path`) which is out of
//! scope for this service - schema-per-tenant and database-per-tenant
//! provisioning belong to a separate, external tenant-provisioning tool.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hinschg_core::{DatabasePool, config::DatabaseConfig};
//!
//! let db = DatabasePool::new(config).await?;
//! let users = sqlx::query("SELECT * FROM users WHERE tenant_id = $1")
//!     .bind(tenant_id)
//!     .fetch_all(db.pool())
//!     .await?;
//! ```

use crate::{config::DatabaseConfig, error::Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Shared PostgreSQL connection pool. Every tenant's rows live in the same
/// tables; isolation is enforced entirely by repository-layer `tenant_id`
/// predicates (see `TenantContext`), not by pool or schema partitioning.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Establishes the shared connection pool.
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!("Initializing database pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        info!("Database pool initialized successfully");

        Ok(Self { pool })
    }

    /// The shared pool. Callers must scope every query with `tenant_id`.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn check_health(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn pool_is_single_shared_handle() {
        // DatabasePool intentionally exposes exactly one pool() accessor -
        // there is no per-tenant pool cache to keep in sync.
        fn assert_clone<T: Clone>() {}
        assert_clone::<super::DatabasePool>();
    }
}
