use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cash_records::dto::CashRecordFilter;
use crate::response::PageParams;
use crate::types::{CashMethod, PaymentMethod};

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Cash record row joined with owner and account display fields.
#[derive(Debug, Clone, FromRow)]
pub struct CashRecordExpanded {
    pub id: Uuid,
    pub amount: f64,
    pub date: i64,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub cash_method: CashMethod,
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub account_name: String,
    pub account_status: bool,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

const SELECT_JOINED: &str = r#"
SELECT c.id, c.amount, c.date, c.payment_method, c.description, c.proof_url,
       c.cash_method, c.account_id, c.user_id, c.created_at, c.updated_at,
       a.account_name AS account_name, a.status AS account_status,
       u.name AS user_name, u.email AS user_email
FROM cash_records c
JOIN accounts a ON a.id = c.account_id
JOIN users u ON u.id = c.user_id
"#;

pub struct NewCashRecord {
    pub amount: f64,
    pub date: Option<i64>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub cash_method: CashMethod,
    pub account_id: Uuid,
    pub user_id: Uuid,
}

pub async fn create(db: &PgPool, new: NewCashRecord) -> sqlx::Result<CashRecordExpanded> {
    let now = now_millis();
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO cash_records
            (amount, date, payment_method, description, proof_url, cash_method,
             account_id, user_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        RETURNING id
        "#,
    )
    .bind(new.amount)
    .bind(new.date.unwrap_or(now))
    .bind(new.payment_method)
    .bind(&new.description)
    .bind(&new.proof_url)
    .bind(new.cash_method)
    .bind(new.account_id)
    .bind(new.user_id)
    .bind(now)
    .fetch_one(db)
    .await?;

    find_owned(db, id, new.user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Owner-scoped fetch: foreign records read as missing.
pub async fn find_owned(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> sqlx::Result<Option<CashRecordExpanded>> {
    sqlx::query_as::<_, CashRecordExpanded>(&format!(
        "{SELECT_JOINED} WHERE c.id = $1 AND c.user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Full-document write, owner-scoped, with a fresh epoch-millis stamp.
pub async fn update(db: &PgPool, r: &CashRecordExpanded) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE cash_records
        SET amount = $3, date = $4, payment_method = $5, description = $6,
            proof_url = $7, cash_method = $8, account_id = $9, updated_at = $10
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(r.id)
    .bind(r.user_id)
    .bind(r.amount)
    .bind(r.date)
    .bind(r.payment_method)
    .bind(&r.description)
    .bind(&r.proof_url)
    .bind(r.cash_method)
    .bind(r.account_id)
    .bind(now_millis())
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM cash_records WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CashRecordFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND c.user_id = ").push_bind(user_id);
    }
    if let Some(account_id) = filter.account_id {
        qb.push(" AND c.account_id = ").push_bind(account_id);
    }
    if let Some(cash_method) = filter.cash_method {
        qb.push(" AND c.cash_method = ").push_bind(cash_method);
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND c.payment_method = ").push_bind(method);
    }
}

pub async fn search(
    db: &PgPool,
    filter: &CashRecordFilter,
    params: &PageParams,
) -> sqlx::Result<(Vec<CashRecordExpanded>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM cash_records c WHERE TRUE",
    );
    apply_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("{SELECT_JOINED} WHERE TRUE"));
    apply_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(params.order_by(
            &[
                ("createdAt", "c.created_at"),
                ("date", "c.date"),
                ("amount", "c.amount"),
            ],
            "c.created_at DESC",
        ))
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let rows = select
        .build_query_as::<CashRecordExpanded>()
        .fetch_all(db)
        .await?;

    Ok((rows, total))
}

/// Scope of one stats request; date bounds are inclusive raw epoch millis.
pub struct CashStatsWindow {
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl CashStatsWindow {
    fn apply(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE user_id = ").push_bind(self.user_id);
        if let Some(account_id) = self.account_id {
            qb.push(" AND account_id = ").push_bind(account_id);
        }
        if let Some(start) = self.start {
            qb.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = self.end {
            qb.push(" AND date <= ").push_bind(end);
        }
    }
}

pub async fn stats_count(db: &PgPool, window: &CashStatsWindow) -> sqlx::Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cash_records");
    window.apply(&mut qb);
    qb.build_query_scalar().fetch_one(db).await
}

pub async fn stats_by_cash_method(
    db: &PgPool,
    window: &CashStatsWindow,
) -> sqlx::Result<Vec<(CashMethod, f64)>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT cash_method, SUM(amount) AS total FROM cash_records",
    );
    window.apply(&mut qb);
    qb.push(" GROUP BY cash_method");
    qb.build_query_as().fetch_all(db).await
}

pub async fn stats_by_payment_method(
    db: &PgPool,
    window: &CashStatsWindow,
) -> sqlx::Result<Vec<(PaymentMethod, f64, i64)>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT payment_method, SUM(amount) AS total, COUNT(*) AS count FROM cash_records",
    );
    window.apply(&mut qb);
    qb.push(" GROUP BY payment_method ORDER BY total DESC");
    qb.build_query_as().fetch_all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::repo as accounts;
    use crate::auth::repo as users;
    use crate::state::test_db;

    async fn make_user(db: &PgPool, email: &str) -> Uuid {
        users::create(
            db,
            users::NewUser {
                name: Some("Owner".into()),
                email: Some(email.into()),
                phone: None,
                password_hash: "stored-hash".into(),
                role: None,
                gender: None,
                account_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn deposit(account_id: Uuid, user_id: Uuid, amount: f64, cash_method: CashMethod) -> NewCashRecord {
        NewCashRecord {
            amount,
            date: None,
            payment_method: PaymentMethod::Upi,
            description: None,
            proof_url: None,
            cash_method,
            account_id,
            user_id,
        }
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn foreign_records_read_as_missing() {
        let db = test_db().await;
        let owner = make_user(&db, "owner@example.com").await;
        let other = make_user(&db, "other@example.com").await;
        let account = accounts::create(&db, "Main", true).await.unwrap();

        let record = create(&db, deposit(account.id, owner, 100.0, CashMethod::CashIn))
            .await
            .unwrap();
        assert_eq!(record.user_id, owner);
        assert_eq!(record.account_name, "Main");

        assert!(find_owned(&db, record.id, owner).await.unwrap().is_some());
        assert!(find_owned(&db, record.id, other).await.unwrap().is_none());

        let mut hijacked = record.clone();
        hijacked.user_id = other;
        assert!(!update(&db, &hijacked).await.unwrap());

        assert!(!delete_owned(&db, record.id, other).await.unwrap());
        assert!(delete_owned(&db, record.id, owner).await.unwrap());
        // Second delete reads as missing.
        assert!(!delete_owned(&db, record.id, owner).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn grouped_sums_split_by_direction() {
        let db = test_db().await;
        let owner = make_user(&db, "owner@example.com").await;
        let account = accounts::create(&db, "Main", true).await.unwrap();

        create(&db, deposit(account.id, owner, 1500.0, CashMethod::CashIn))
            .await
            .unwrap();
        create(&db, deposit(account.id, owner, 400.5, CashMethod::CashOut))
            .await
            .unwrap();

        let window = CashStatsWindow {
            user_id: owner,
            account_id: Some(account.id),
            start: None,
            end: None,
        };
        assert_eq!(stats_count(&db, &window).await.unwrap(), 2);

        let rows = stats_by_cash_method(&db, &window).await.unwrap();
        let total_in = rows
            .iter()
            .find(|(m, _)| *m == CashMethod::CashIn)
            .map(|(_, t)| *t);
        let total_out = rows
            .iter()
            .find(|(m, _)| *m == CashMethod::CashOut)
            .map(|(_, t)| *t);
        assert_eq!(total_in, Some(1500.0));
        assert_eq!(total_out, Some(400.5));
    }
}
