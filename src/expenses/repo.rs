use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::expenses::dto::ExpenseFilter;
use crate::response::{escape_like, PageParams};
use crate::types::{PaymentMethod, Reimbursement};

/// Expense row joined with its owner's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct ExpenseWithOwner {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    pub date: OffsetDateTime,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub reimbursement: Reimbursement,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

const SELECT_JOINED: &str = r#"
SELECT e.id, e.title, e.amount, e.date, e.category, e.payment_method,
       e.reimbursement, e.description, e.proof_url, e.user_id,
       e.created_at, e.updated_at,
       u.name AS user_name, u.email AS user_email
FROM expenses e
JOIN users u ON u.id = e.user_id
"#;

pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub date: Option<OffsetDateTime>,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub reimbursement: Reimbursement,
    pub description: Option<String>,
    pub proof_url: Option<String>,
    pub user_id: Uuid,
}

pub async fn create(db: &PgPool, new: NewExpense) -> sqlx::Result<ExpenseWithOwner> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO expenses
            (title, amount, date, category, payment_method, reimbursement,
             description, proof_url, user_id)
        VALUES ($1, $2, COALESCE($3, now()), $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(&new.title)
    .bind(new.amount)
    .bind(new.date)
    .bind(&new.category)
    .bind(new.payment_method)
    .bind(new.reimbursement)
    .bind(&new.description)
    .bind(&new.proof_url)
    .bind(new.user_id)
    .fetch_one(db)
    .await?;

    // Re-read joined so the response carries the owner expansion.
    find_owned(db, id, new.user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Owner-scoped fetch: a record belonging to someone else is
/// indistinguishable from a missing one.
pub async fn find_owned(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> sqlx::Result<Option<ExpenseWithOwner>> {
    sqlx::query_as::<_, ExpenseWithOwner>(&format!(
        "{SELECT_JOINED} WHERE e.id = $1 AND e.user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Full-document write with an explicit updated-at stamp; scoped to the
/// owner so a foreign id updates nothing.
pub async fn update(db: &PgPool, e: &ExpenseWithOwner) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET title = $3, amount = $4, date = $5, category = $6,
            payment_method = $7, reimbursement = $8, description = $9,
            proof_url = $10, updated_at = now()
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(e.id)
    .bind(e.user_id)
    .bind(&e.title)
    .bind(e.amount)
    .bind(e.date)
    .bind(&e.category)
    .bind(e.payment_method)
    .bind(e.reimbursement)
    .bind(&e.description)
    .bind(&e.proof_url)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ExpenseFilter) {
    if let Some(user_id) = filter.user_id {
        qb.push(" AND e.user_id = ").push_bind(user_id);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND e.category = ").push_bind(category.clone());
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND e.payment_method = ").push_bind(method);
    }
    if let Some(reimbursement) = filter.reimbursement {
        qb.push(" AND e.reimbursement = ").push_bind(reimbursement);
    }
    if let Some(title) = &filter.title {
        qb.push(" AND e.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }
}

pub async fn search(
    db: &PgPool,
    filter: &ExpenseFilter,
    params: &PageParams,
) -> sqlx::Result<(Vec<ExpenseWithOwner>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM expenses e WHERE TRUE",
    );
    apply_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("{SELECT_JOINED} WHERE TRUE"));
    apply_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(params.order_by(
            &[
                ("createdAt", "e.created_at"),
                ("date", "e.date"),
                ("amount", "e.amount"),
            ],
            "e.created_at DESC",
        ))
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let rows = select
        .build_query_as::<ExpenseWithOwner>()
        .fetch_all(db)
        .await?;

    Ok((rows, total))
}

/// Scope of one stats request: always a single owner, with optional
/// inclusive calendar-date bounds.
pub struct StatsWindow {
    pub user_id: Uuid,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl StatsWindow {
    fn apply(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE user_id = ").push_bind(self.user_id);
        if let Some(start) = self.start {
            qb.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = self.end {
            qb.push(" AND date <= ").push_bind(end);
        }
    }
}

pub async fn stats_count(db: &PgPool, window: &StatsWindow) -> sqlx::Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM expenses");
    window.apply(&mut qb);
    qb.build_query_scalar().fetch_one(db).await
}

pub async fn stats_total(db: &PgPool, window: &StatsWindow) -> sqlx::Result<f64> {
    let mut qb =
        QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(amount), 0) FROM expenses");
    window.apply(&mut qb);
    qb.build_query_scalar().fetch_one(db).await
}

pub async fn stats_by_category(
    db: &PgPool,
    window: &StatsWindow,
) -> sqlx::Result<Vec<(String, f64, i64)>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT category, SUM(amount) AS total, COUNT(*) AS count FROM expenses",
    );
    window.apply(&mut qb);
    qb.push(" GROUP BY category ORDER BY total DESC");
    qb.build_query_as().fetch_all(db).await
}

pub async fn stats_by_payment_method(
    db: &PgPool,
    window: &StatsWindow,
) -> sqlx::Result<Vec<(PaymentMethod, f64, i64)>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT payment_method, SUM(amount) AS total, COUNT(*) AS count FROM expenses",
    );
    window.apply(&mut qb);
    qb.push(" GROUP BY payment_method ORDER BY total DESC");
    qb.build_query_as().fetch_all(db).await
}

pub async fn stats_by_reimbursement(
    db: &PgPool,
    window: &StatsWindow,
) -> sqlx::Result<Vec<(Reimbursement, f64, i64)>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT reimbursement, SUM(amount) AS total, COUNT(*) AS count FROM expenses",
    );
    window.apply(&mut qb);
    qb.push(" GROUP BY reimbursement");
    qb.build_query_as().fetch_all(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo as users;
    use crate::state::test_db;

    async fn make_user(db: &PgPool, name: &str, email: &str) -> Uuid {
        users::create(
            db,
            users::NewUser {
                name: Some(name.into()),
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

    fn groceries(user_id: Uuid) -> NewExpense {
        NewExpense {
            title: "Groceries".into(),
            amount: 42.5,
            date: None,
            category: "Food".into(),
            payment_method: PaymentMethod::Cash,
            reimbursement: Reimbursement::No,
            description: None,
            proof_url: None,
            user_id,
        }
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn foreign_records_read_as_missing() {
        let db = test_db().await;
        let owner = make_user(&db, "Owner", "owner@example.com").await;
        let other = make_user(&db, "Other", "other@example.com").await;

        let expense = create(&db, groceries(owner)).await.unwrap();
        assert_eq!(expense.user_id, owner);

        assert!(find_owned(&db, expense.id, owner).await.unwrap().is_some());
        assert!(find_owned(&db, expense.id, other).await.unwrap().is_none());

        // A write scoped to the wrong owner touches nothing.
        let mut hijacked = expense.clone();
        hijacked.user_id = other;
        hijacked.title = "Hijacked".into();
        assert!(!update(&db, &hijacked).await.unwrap());
        let kept = find_owned(&db, expense.id, owner).await.unwrap().unwrap();
        assert_eq!(kept.title, "Groceries");

        assert!(!delete_owned(&db, expense.id, other).await.unwrap());
        assert!(delete_owned(&db, expense.id, owner).await.unwrap());
        // Second delete reads as missing.
        assert!(!delete_owned(&db, expense.id, owner).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn create_then_search_roundtrip() {
        let db = test_db().await;
        let owner = make_user(&db, "Owner", "owner@example.com").await;

        let created = create(&db, groceries(owner)).await.unwrap();
        let mut rent = groceries(owner);
        rent.title = "Rent".into();
        rent.category = "Housing".into();
        create(&db, rent).await.unwrap();

        let filter = ExpenseFilter {
            title: Some("grocer".into()),
            ..Default::default()
        };
        let (rows, total) = search(&db, &filter, &PageParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, created.id);
        assert_eq!(rows[0].user_name.as_deref(), Some("Owner"));

        // Totals count the whole filtered set regardless of page size.
        let one_per_page: PageParams = serde_json::from_str(r#"{"limit":1}"#).unwrap();
        let (rows, total) = search(&db, &ExpenseFilter::default(), &one_per_page)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
    }
}
