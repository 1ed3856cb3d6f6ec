use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::UserFilter;
use crate::response::{escape_like, PageParams};

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, gender, account_id, created_at";

/// User record. The hash never leaves the repository layer in serialized
/// form; responses go through `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Option<String>,
    pub gender: Option<String>,
    pub account_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Option<String>,
    pub gender: Option<String>,
    pub account_id: Option<Uuid>,
}

/// Combined existence check used at registration: matches on either
/// identifier independently.
pub async fn exists_by_email_or_phone(
    db: &PgPool,
    email: Option<&str>,
    phone: Option<&str>,
) -> sqlx::Result<bool> {
    let id: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM users
        WHERE ($1::text IS NOT NULL AND email = $1)
           OR ($2::text IS NOT NULL AND phone = $2)
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(phone)
    .fetch_optional(db)
    .await?;
    Ok(id.is_some())
}

pub async fn create(db: &PgPool, new: NewUser) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, email, phone, password_hash, role, gender, account_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(new.name)
    .bind(new.email)
    .bind(new.phone)
    .bind(new.password_hash)
    .bind(new.role)
    .bind(new.gender)
    .bind(new.account_id)
    .fetch_one(db)
    .await
}

pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn find_by_phone(db: &PgPool, phone: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1"))
        .bind(phone)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(email) = &filter.email {
        qb.push(" AND email = ").push_bind(email.clone());
    }
    if let Some(phone) = &filter.phone {
        qb.push(" AND phone = ").push_bind(phone.clone());
    }
    if let Some(role) = &filter.role {
        qb.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(gender) = &filter.gender {
        qb.push(" AND gender = ").push_bind(gender.clone());
    }
}

pub async fn search(
    db: &PgPool,
    filter: &UserFilter,
    params: &PageParams,
) -> sqlx::Result<(Vec<User>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
    apply_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!(
        "SELECT {USER_COLUMNS} FROM users WHERE TRUE"
    ));
    apply_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(params.order_by(&[("createdAt", "created_at"), ("name", "name")], "created_at DESC"))
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let users = select.build_query_as::<User>().fetch_all(db).await?;

    Ok((users, total))
}

/// Full-document write; the caller has already applied partial fields and
/// re-hashed the password when it changed.
pub async fn update(db: &PgPool, user: &User) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = $2, email = $3, phone = $4, password_hash = $5,
            role = $6, gender = $7, account_id = $8
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(&user.role)
    .bind(&user.gender)
    .bind(user.account_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::state::test_db;

    fn sample_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            name: Some("Asha".into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
            password_hash: "stored-hash".into(),
            role: None,
            gender: None,
            account_id: None,
        }
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_registration_is_rejected() {
        let db = test_db().await;
        create(&db, sample_user("asha@example.com", "9876543210"))
            .await
            .unwrap();

        // The combined existence check matches on either identifier alone.
        assert!(
            exists_by_email_or_phone(&db, Some("asha@example.com"), None)
                .await
                .unwrap()
        );
        assert!(exists_by_email_or_phone(&db, None, Some("9876543210"))
            .await
            .unwrap());
        assert!(
            !exists_by_email_or_phone(&db, Some("other@example.com"), Some("0001112223"))
                .await
                .unwrap()
        );

        // A racing insert past the check still surfaces as a conflict.
        let err = create(&db, sample_user("asha@example.com", "1112223334"))
            .await
            .unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn delete_reports_missing_on_second_call() {
        let db = test_db().await;
        let user = create(&db, sample_user("gone@example.com", "5556667778"))
            .await
            .unwrap();

        assert!(delete(&db, user.id).await.unwrap());
        assert!(!delete(&db, user.id).await.unwrap());
    }
}
