// ============================================================================
// Vault Infrastructure - PostgreSQL Fund Repository
// File: crates/vault-infrastructure/src/database/postgres/fund_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use vault_core::domain::Fund;
use vault_core::error::DomainError;
use vault_core::repositories::FundRepository;

use super::db_error;

pub struct PgFundRepository {
    pool: PgPool,
}

impl PgFundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct FundRow {
    id: Uuid,
    code: String,
    name: String,
    region: Option<String>,
    currency: Option<String>,
    manager_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FundRow> for Fund {
    fn from(row: FundRow) -> Self {
        Fund {
            id: row.id,
            code: row.code,
            name: row.name,
            region: row.region,
            currency: row.currency,
            manager_ids: row.manager_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const FUND_SELECT: &str = r#"
    SELECT f.id, f.code, f.name, f.region, f.currency, f.created_at, f.updated_at,
           COALESCE(
               ARRAY_AGG(fm.user_id ORDER BY fm.user_id) FILTER (WHERE fm.user_id IS NOT NULL),
               '{}'
           ) AS manager_ids
    FROM funds f
    LEFT JOIN fund_managers fm ON fm.fund_id = f.id
"#;

async fn replace_managers(
    tx: &mut Transaction<'_, Postgres>,
    fund_id: &Uuid,
    manager_ids: &[Uuid],
) -> Result<(), DomainError> {
    sqlx::query("DELETE FROM fund_managers WHERE fund_id = $1")
        .bind(fund_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("clearing fund managers"))?;

    if !manager_ids.is_empty() {
        sqlx::query(
            "INSERT INTO fund_managers (fund_id, user_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(fund_id)
        .bind(manager_ids)
        .execute(&mut **tx)
        .await
        .map_err(db_error("linking fund managers"))?;
    }
    Ok(())
}

#[async_trait]
impl FundRepository for PgFundRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Fund>, DomainError> {
        let row: Option<FundRow> =
            sqlx::query_as(&format!("{} WHERE f.id = $1 GROUP BY f.id", FUND_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding fund"))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, managed_by: Option<Uuid>) -> Result<Vec<Fund>, DomainError> {
        let rows: Vec<FundRow> = sqlx::query_as(&format!(
            r#"
            {}
            WHERE $1::uuid IS NULL
               OR f.id IN (SELECT fund_id FROM fund_managers WHERE user_id = $1)
            GROUP BY f.id
            ORDER BY f.code
            "#,
            FUND_SELECT
        ))
        .bind(managed_by)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing funds"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, fund: &Fund) -> Result<Fund, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO funds (id, code, name, region, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(fund.id)
        .bind(&fund.code)
        .bind(&fund.name)
        .bind(&fund.region)
        .bind(&fund.currency)
        .bind(fund.created_at)
        .bind(fund.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("creating fund"))?;

        replace_managers(&mut tx, &fund.id, &fund.manager_ids).await?;
        tx.commit().await.map_err(db_error("committing fund"))?;

        info!("Fund created: {} ({})", fund.code, fund.id);
        Ok(fund.clone())
    }

    async fn update(&self, fund: &Fund) -> Result<Fund, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE funds
            SET code = $2, name = $3, region = $4, currency = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(fund.id)
        .bind(&fund.code)
        .bind(&fund.name)
        .bind(&fund.region)
        .bind(&fund.currency)
        .bind(fund.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("updating fund"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Fund", fund.id));
        }

        replace_managers(&mut tx, &fund.id, &fund.manager_ids).await?;
        tx.commit().await.map_err(db_error("committing fund"))?;
        Ok(fund.clone())
    }

    async fn managed_fund_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar::<_, Uuid>("SELECT fund_id FROM fund_managers WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("loading managed funds"))
    }
}
