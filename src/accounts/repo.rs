use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::dto::AccountFilter;
use crate::response::{escape_like, PageParams};

const ACCOUNT_COLUMNS: &str = "id, account_name, status, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub account_name: String,
    pub status: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn create(db: &PgPool, account_name: &str, status: bool) -> sqlx::Result<Account> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        INSERT INTO accounts (account_name, status)
        VALUES ($1, $2)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(account_name)
    .bind(status)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Account>> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Full-document write with an explicit updated-at stamp.
pub async fn update(db: &PgPool, account: &Account) -> sqlx::Result<Account> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        UPDATE accounts
        SET account_name = $2, status = $3, updated_at = now()
        WHERE id = $1
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(account.id)
    .bind(&account.account_name)
    .bind(account.status)
    .fetch_one(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AccountFilter) {
    if let Some(name) = &filter.account_name {
        qb.push(" AND account_name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

pub async fn search(
    db: &PgPool,
    filter: &AccountFilter,
    params: &PageParams,
) -> sqlx::Result<(Vec<Account>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts WHERE TRUE");
    apply_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE TRUE"
    ));
    apply_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(params.order_by(
            &[("createdAt", "created_at"), ("accountName", "account_name")],
            "created_at DESC",
        ))
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let accounts = select.build_query_as::<Account>().fetch_all(db).await?;

    Ok((accounts, total))
}
