//! PostgreSQL repository implementation
//!
//! Rows live in `circuit_breaker_rules`, keyed by `(id, version)`. The full
//! rule is kept as JSON in `content`; the key, name, namespace, tombstone flag
//! and timestamps are mirrored into columns for indexing.
//!
//! Uniqueness is enforced by the database, not by a read-then-write:
//!
//! - the primary key covers `(id, version)`, and an insert only overwrites a
//!   colliding row when that row is a tombstone
//! - a partial unique index covers `(name, namespace)` for live masters
//!
//! Mutations of an existing row run in a transaction holding `FOR UPDATE` on
//! that row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use faultline_core::{
    BindingKey, CircuitBreakerRule, Release, RuleKey, RuleVersion, ServiceRef,
};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::{error::RepositoryError, traits::*, RepositoryResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS circuit_breaker_rules (
        id          TEXT        NOT NULL,
        version     TEXT        NOT NULL,
        name        TEXT        NOT NULL,
        namespace   TEXT        NOT NULL,
        content     JSONB       NOT NULL,
        deleted     BOOLEAN     NOT NULL DEFAULT FALSE,
        created_at  TIMESTAMPTZ NOT NULL,
        modified_at TIMESTAMPTZ NOT NULL,
        seq         BIGSERIAL,
        PRIMARY KEY (id, version)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS circuit_breaker_rules_live_master
        ON circuit_breaker_rules (name, namespace)
        WHERE version = 'master' AND NOT deleted
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS circuit_breaker_rules_by_name
        ON circuit_breaker_rules (name, namespace)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS circuit_breaker_releases (
        rule_id           TEXT        NOT NULL,
        rule_version      TEXT        NOT NULL,
        service           TEXT        NOT NULL,
        service_namespace TEXT        NOT NULL,
        created_at        TIMESTAMPTZ NOT NULL,
        seq               BIGSERIAL,
        PRIMARY KEY (rule_id, rule_version, service, service_namespace)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS circuit_breaker_releases_by_service
        ON circuit_breaker_releases (service, service_namespace)
    "#,
];

const RULE_COLUMNS: &str = "content, deleted, modified_at";
const RELEASE_COLUMNS: &str = "rule_id, rule_version, service, service_namespace, created_at";

/// PostgreSQL rule repository
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect and make sure the schema exists
    ///
    /// # Example
    /// ```no_run
    /// use faultline_repository::PostgresRepository;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let repo = PostgresRepository::new("postgresql://localhost/faultline").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(database_url: &str) -> RepositoryResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        let repo = Self::with_pool(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Use an existing pool; the caller is responsible for the schema
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they are missing
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn rule_from_row(row: &PgRow) -> RepositoryResult<CircuitBreakerRule> {
    let content: serde_json::Value = row.try_get("content")?;
    let mut rule: CircuitBreakerRule = serde_json::from_value(content)?;
    rule.deleted = row.try_get("deleted")?;
    rule.modified_at = row.try_get("modified_at")?;
    Ok(rule)
}

fn release_from_row(row: &PgRow) -> RepositoryResult<Release> {
    let version: String = row.try_get("rule_version")?;
    Ok(Release {
        rule: RuleKey::new(row.try_get::<String, _>("rule_id")?, RuleVersion::from(version)),
        service: ServiceRef::new(
            row.try_get::<String, _>("service")?,
            row.try_get::<String, _>("service_namespace")?,
        ),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl RuleRepository for PostgresRepository {
    async fn put_if_absent(&self, rule: CircuitBreakerRule) -> RepositoryResult<CircuitBreakerRule> {
        let content = serde_json::to_value(&rule)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO circuit_breaker_rules
                (id, version, name, namespace, content, deleted, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
            ON CONFLICT (id, version) DO UPDATE
            SET name = EXCLUDED.name,
                namespace = EXCLUDED.namespace,
                content = EXCLUDED.content,
                deleted = FALSE,
                created_at = EXCLUDED.created_at,
                modified_at = EXCLUDED.modified_at,
                seq = nextval(pg_get_serial_sequence('circuit_breaker_rules', 'seq'))
            WHERE circuit_breaker_rules.deleted
            RETURNING id
            "#,
        )
        .bind(&rule.id)
        .bind(rule.version.as_str())
        .bind(&rule.name)
        .bind(&rule.namespace)
        .bind(&content)
        .bind(rule.created_at)
        .bind(rule.modified_at)
        .fetch_optional(&self.pool)
        .await;

        match inserted {
            Ok(Some(_)) => Ok(rule),
            Ok(None) => {
                debug!(rule = %rule.key(), "insert rejected, version already exists");
                Err(RepositoryError::Conflict(format!(
                    "rule {} already exists",
                    rule.key()
                )))
            }
            Err(err) if is_unique_violation(&err) => {
                debug!(name = %rule.name, namespace = %rule.namespace, "insert rejected, name already taken");
                Err(RepositoryError::Conflict(format!(
                    "rule {}/{} already exists",
                    rule.namespace, rule.name
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, key: &RuleKey) -> RepositoryResult<Option<CircuitBreakerRule>> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM circuit_breaker_rules \
             WHERE id = $1 AND version = $2 AND NOT deleted"
        ))
        .bind(&key.id)
        .bind(key.version.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(rule_from_row).transpose()
    }

    async fn update(
        &self,
        key: &RuleKey,
        mutator: RuleMutator,
    ) -> RepositoryResult<CircuitBreakerRule> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM circuit_breaker_rules \
             WHERE id = $1 AND version = $2 AND NOT deleted FOR UPDATE"
        ))
        .bind(&key.id)
        .bind(key.version.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound { key: key.clone() })?;

        let current = rule_from_row(&row)?;
        let mut updated = current.clone();
        mutator(&mut updated);
        updated.id = current.id;
        updated.version = current.version;
        updated.name = current.name;
        updated.namespace = current.namespace;
        updated.created_at = current.created_at;
        updated.deleted = false;

        sqlx::query(
            r#"
            UPDATE circuit_breaker_rules
            SET content = $3, modified_at = $4
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(&key.id)
        .bind(key.version.as_str())
        .bind(serde_json::to_value(&updated)?)
        .bind(updated.modified_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn soft_delete(&self, key: &RuleKey) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE circuit_breaker_rules
            SET deleted = TRUE, modified_at = NOW()
            WHERE id = $1 AND version = $2 AND NOT deleted
            "#,
        )
        .bind(&key.id)
        .bind(key.version.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_index(&self, index: &RuleIndex) -> RepositoryResult<Vec<CircuitBreakerRule>> {
        let rows = match index {
            RuleIndex::ById(id) => {
                sqlx::query(&format!(
                    "SELECT {RULE_COLUMNS} FROM circuit_breaker_rules \
                     WHERE id = $1 AND NOT deleted ORDER BY created_at, seq"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            RuleIndex::ByName { name, namespace } => {
                sqlx::query(&format!(
                    "SELECT {RULE_COLUMNS} FROM circuit_breaker_rules \
                     WHERE name = $1 AND namespace = $2 AND NOT deleted ORDER BY created_at, seq"
                ))
                .bind(name)
                .bind(namespace)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(rule_from_row).collect()
    }

    async fn put_binding_if_absent(&self, release: Release) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO circuit_breaker_releases
                (rule_id, rule_version, service, service_namespace, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&release.rule.id)
        .bind(release.rule.version.as_str())
        .bind(&release.service.name)
        .bind(&release.service.namespace)
        .bind(release.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_binding(&self, key: &BindingKey) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM circuit_breaker_releases
            WHERE rule_id = $1 AND rule_version = $2 AND service = $3 AND service_namespace = $4
            "#,
        )
        .bind(&key.rule.id)
        .bind(key.rule.version.as_str())
        .bind(&key.service.name)
        .bind(&key.service.namespace)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_bindings(&self, index: &BindingIndex) -> RepositoryResult<Vec<Release>> {
        let rows = match index {
            BindingIndex::ByRule(id) => {
                sqlx::query(&format!(
                    "SELECT {RELEASE_COLUMNS} FROM circuit_breaker_releases \
                     WHERE rule_id = $1 ORDER BY created_at, seq"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            BindingIndex::ByVersion(key) => {
                sqlx::query(&format!(
                    "SELECT {RELEASE_COLUMNS} FROM circuit_breaker_releases \
                     WHERE rule_id = $1 AND rule_version = $2 ORDER BY created_at, seq"
                ))
                .bind(&key.id)
                .bind(key.version.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            BindingIndex::ByService(service) => {
                sqlx::query(&format!(
                    "SELECT {RELEASE_COLUMNS} FROM circuit_breaker_releases \
                     WHERE service = $1 AND service_namespace = $2 ORDER BY created_at, seq"
                ))
                .bind(&service.name)
                .bind(&service.namespace)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(release_from_row).collect()
    }

    async fn purge_rule(&self, id: &str) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM circuit_breaker_releases WHERE rule_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM circuit_breaker_rules WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(rule_id = %id, "purged rule");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
