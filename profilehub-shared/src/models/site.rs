/// Site model
///
/// Sites are the partitioning entity: registration settings, the security
/// question index, and imported legacy identities are all scoped to a site.
///
/// Creating a site provisions its security-question index and a default
/// settings row in the same transaction, so an installation always has
/// exactly one index per site without a separate provisioning step.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sites (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     hostname VARCHAR(255) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Site model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    /// Unique site ID (UUID v4)
    pub id: Uuid,

    /// Hostname this site serves (unique)
    pub hostname: String,

    /// Human-readable site name
    pub name: String,

    /// When the site was created
    pub created_at: DateTime<Utc>,
}

impl Site {
    /// Creates a new site, provisioning its security-question index and a
    /// default settings row in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname already exists or the database
    /// connection fails.
    pub async fn create(pool: &PgPool, hostname: &str, name: &str) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (hostname, name)
            VALUES ($1, $2)
            RETURNING id, hostname, name, created_at
            "#,
        )
        .bind(hostname)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO security_question_indexes (site_id) VALUES ($1)")
            .bind(site.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO profile_settings (site_id) VALUES ($1)")
            .bind(site.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(site_id = %site.id, hostname = %site.hostname, "Site created");
        Ok(site)
    }

    /// Finds a site by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let site = sqlx::query_as::<_, Site>(
            "SELECT id, hostname, name, created_at FROM sites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(site)
    }

    /// Finds a site by hostname
    pub async fn find_by_hostname(
        pool: &PgPool,
        hostname: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let site = sqlx::query_as::<_, Site>(
            "SELECT id, hostname, name, created_at FROM sites WHERE hostname = $1",
        )
        .bind(hostname)
        .fetch_optional(pool)
        .await?;

        Ok(site)
    }

    /// Resolves the site serving a request.
    ///
    /// Tries the request's Host header value first (port stripped), then
    /// falls back to the configured default hostname.
    pub async fn resolve(
        pool: &PgPool,
        host_header: Option<&str>,
        default_hostname: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        if let Some(host) = host_header {
            let hostname = host.split(':').next().unwrap_or(host);
            if let Some(site) = Self::find_by_hostname(pool, hostname).await? {
                return Ok(Some(site));
            }
        }

        Self::find_by_hostname(pool, default_hostname).await
    }
}

#[cfg(test)]
mod tests {
    // Site creation requires a database; covered by integration tests.
    // Host resolution parsing is exercised through resolve()'s port strip.

    #[test]
    fn test_host_header_port_strip() {
        let host = "example.org:8080";
        assert_eq!(host.split(':').next().unwrap(), "example.org");
    }
}
