use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::response::{escape_like, PageParams};
use crate::roles::dto::{PermissionNode, RoleFilter};
use crate::types::RoleStatus;

const ROLE_COLUMNS: &str =
    "id, role_name, allowed_end_points, permission, status, created_at, updated_at";

/// Authorization policy document. Inert data in this service: nothing
/// consults it at request time.
#[derive(Debug, Clone, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub role_name: String,
    pub allowed_end_points: Vec<String>,
    pub permission: Json<Vec<PermissionNode>>,
    pub status: RoleStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn create(
    db: &PgPool,
    role_name: &str,
    allowed_end_points: Vec<String>,
    permission: Vec<PermissionNode>,
    status: RoleStatus,
) -> sqlx::Result<Role> {
    sqlx::query_as::<_, Role>(&format!(
        r#"
        INSERT INTO roles (role_name, allowed_end_points, permission, status)
        VALUES ($1, $2, $3, $4)
        RETURNING {ROLE_COLUMNS}
        "#
    ))
    .bind(role_name)
    .bind(allowed_end_points)
    .bind(Json(permission))
    .bind(status)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Role>> {
    sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Full-document write with an explicit updated-at stamp.
pub async fn update(db: &PgPool, role: &Role) -> sqlx::Result<Role> {
    sqlx::query_as::<_, Role>(&format!(
        r#"
        UPDATE roles
        SET role_name = $2, allowed_end_points = $3, permission = $4,
            status = $5, updated_at = now()
        WHERE id = $1
        RETURNING {ROLE_COLUMNS}
        "#
    ))
    .bind(role.id)
    .bind(&role.role_name)
    .bind(&role.allowed_end_points)
    .bind(&role.permission)
    .bind(role.status)
    .fetch_one(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn apply_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    if let Some(name) = &filter.role_name {
        qb.push(" AND role_name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

pub async fn search(
    db: &PgPool,
    filter: &RoleFilter,
    params: &PageParams,
) -> sqlx::Result<(Vec<Role>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles WHERE TRUE");
    apply_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut select =
        QueryBuilder::<Postgres>::new(format!("SELECT {ROLE_COLUMNS} FROM roles WHERE TRUE"));
    apply_filter(&mut select, filter);
    select
        .push(" ORDER BY ")
        .push(params.order_by(
            &[("createdAt", "created_at"), ("roleName", "role_name")],
            "created_at DESC",
        ))
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let roles = select.build_query_as::<Role>().fetch_all(db).await?;

    Ok((roles, total))
}
