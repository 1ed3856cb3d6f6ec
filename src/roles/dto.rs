use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::roles::repo::Role;
use crate::types::RoleStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrudPermission {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildPermission {
    pub value: String,
    pub permission: Vec<CrudPermission>,
}

/// Named capability entry in a role's policy tree. Nesting is exactly one
/// level: a node may carry children, children may not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionNode {
    pub value: String,
    pub permission: Vec<CrudPermission>,
    #[serde(default)]
    pub child: Vec<ChildPermission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRoleRequest {
    pub role_name: Option<String>,
    #[serde(default)]
    pub allowed_end_points: Vec<String>,
    #[serde(default)]
    pub permission: Vec<PermissionNode>,
    pub status: Option<RoleStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[serde(rename = "_id")]
    pub id: Option<Uuid>,
    pub role_name: Option<String>,
    pub allowed_end_points: Option<Vec<String>>,
    pub permission: Option<Vec<PermissionNode>>,
    pub status: Option<RoleStatus>,
}

/// Allow-listed search keys for role lookup.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFilter {
    pub role_name: Option<String>,
    pub status: Option<RoleStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub role_name: String,
    pub allowed_end_points: Vec<String>,
    pub permission: Vec<PermissionNode>,
    pub status: RoleStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Role> for RoleDto {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            role_name: r.role_name,
            allowed_end_points: r.allowed_end_points,
            permission: r.permission.0,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_tree_roundtrips_one_level_of_nesting() {
        let json = r#"
        {
            "value": "expenses",
            "permission": [{"read": true, "write": true, "delete": false}],
            "child": [
                {"value": "stats", "permission": [{"read": true, "write": false, "delete": false}]}
            ]
        }"#;
        let node: PermissionNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.value, "expenses");
        assert_eq!(node.child.len(), 1);
        assert!(node.child[0].permission[0].read);

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["child"][0]["value"], "stats");
    }

    #[test]
    fn child_defaults_to_empty() {
        let node: PermissionNode = serde_json::from_str(
            r#"{"value":"accounts","permission":[{"read":true,"write":true,"delete":true}]}"#,
        )
        .unwrap();
        assert!(node.child.is_empty());
    }
}
