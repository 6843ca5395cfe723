//! Atlas control-plane tools.
//!
//! All of them go through the `AtlasApi` contract; when no service-account
//! credentials are configured the tools fail with a clear message instead
//! of guessing.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::atlas::{temporary_user_expiry, AccessListEntry, AtlasApi, DatabaseRole, DbUserSpec};
use crate::content::wrap_untrusted;
use crate::error::ServerError;
use crate::tool::{
    parse_args, schema_for, OperationType, ServerTool, ToolCategory, ToolContext, ToolOutput,
};

fn atlas_api(ctx: &ToolContext) -> Result<Arc<dyn AtlasApi>, ServerError> {
    ctx.session.atlas().ok_or_else(|| {
        ServerError::unexpected(
            "Atlas API credentials are not configured; set MDB_MCP_API_CLIENT_ID and MDB_MCP_API_CLIENT_SECRET",
        )
    })
}

fn json_block(value: &serde_json::Value) -> String {
    wrap_untrusted(&serde_json::to_string_pretty(value).unwrap_or_default())
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AtlasListOrgsRequest {}

pub struct AtlasListOrgsTool;

#[async_trait]
impl ServerTool for AtlasListOrgsTool {
    fn name(&self) -> &'static str {
        "atlas-list-orgs"
    }

    fn description(&self) -> &'static str {
        "List the Atlas organizations visible to the configured service account."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Atlas
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AtlasListOrgsRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let _request: AtlasListOrgsRequest = parse_args(args)?;
        let orgs = atlas_api(ctx)?.list_orgs().await?;
        Ok(ToolOutput::texts(vec![
            format!("Found {} organization(s).", orgs.len()),
            json_block(&serde_json::Value::Array(orgs)),
        ]))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AtlasListProjectsRequest {}

pub struct AtlasListProjectsTool;

#[async_trait]
impl ServerTool for AtlasListProjectsTool {
    fn name(&self) -> &'static str {
        "atlas-list-projects"
    }

    fn description(&self) -> &'static str {
        "List the Atlas projects visible to the configured service account."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Atlas
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AtlasListProjectsRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let _request: AtlasListProjectsRequest = parse_args(args)?;
        let projects = atlas_api(ctx)?.list_projects().await?;
        Ok(ToolOutput::texts(vec![
            format!("Found {} project(s).", projects.len()),
            json_block(&serde_json::Value::Array(projects)),
        ]))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AtlasInspectClusterRequest {
    pub project_id: String,
    pub cluster_name: String,
}

pub struct AtlasInspectClusterTool;

#[async_trait]
impl ServerTool for AtlasInspectClusterTool {
    fn name(&self) -> &'static str {
        "atlas-inspect-cluster"
    }

    fn description(&self) -> &'static str {
        "Inspect an Atlas cluster: state, version, connection strings and topology."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Atlas
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Read
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AtlasInspectClusterRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: AtlasInspectClusterRequest = parse_args(args)?;
        let cluster = atlas_api(ctx)?
            .inspect_cluster(&request.project_id, &request.cluster_name)
            .await?;
        Ok(ToolOutput::texts(vec![
            format!("Cluster '{}':", request.cluster_name),
            json_block(&cluster),
        ]))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AtlasCreateAccessListRequest {
    pub project_id: String,
    /// Addresses or CIDR blocks to allow.
    pub entries: Vec<AccessListEntry>,
}

pub struct AtlasCreateAccessListTool;

#[async_trait]
impl ServerTool for AtlasCreateAccessListTool {
    fn name(&self) -> &'static str {
        "atlas-create-access-list"
    }

    fn description(&self) -> &'static str {
        "Add IP addresses or CIDR blocks to a project's access list."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Atlas
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Create
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AtlasCreateAccessListRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: AtlasCreateAccessListRequest = parse_args(args)?;
        if request.entries.is_empty() {
            return Err(ServerError::invalid_arguments(
                "entries must contain at least one address or CIDR block",
            ));
        }
        for entry in &request.entries {
            if entry.ip_address.is_none() && entry.cidr_block.is_none() {
                return Err(ServerError::invalid_arguments(
                    "each entry needs an ipAddress or a cidrBlock",
                ));
            }
        }
        atlas_api(ctx)?
            .create_access_list(&request.project_id, &request.entries)
            .await?;
        Ok(ToolOutput::text(format!(
            "Added {} entr(ies) to the access list of project {}.",
            request.entries.len(),
            request.project_id
        )))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AtlasCreateDbUserRequest {
    pub project_id: String,
    pub username: String,
    /// Generated when omitted.
    #[serde(default)]
    pub password: Option<String>,
    /// Roles to grant; defaults to readWriteAnyDatabase.
    #[serde(default)]
    pub roles: Vec<DatabaseRole>,
    /// Create a temporary user that expires after the configured lifetime.
    #[serde(default)]
    pub temporary: bool,
}

pub struct AtlasCreateDbUserTool;

impl AtlasCreateDbUserTool {
    fn generate_password() -> String {
        use rand::{distributions::Alphanumeric, Rng};
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl ServerTool for AtlasCreateDbUserTool {
    fn name(&self) -> &'static str {
        "atlas-create-db-user"
    }

    fn description(&self) -> &'static str {
        "Create an Atlas database user, optionally temporary."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Atlas
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Create
    }

    fn args_schema(&self) -> Arc<JsonObject> {
        schema_for::<AtlasCreateDbUserRequest>()
    }

    async fn execute(&self, args: JsonObject, ctx: &ToolContext) -> Result<ToolOutput, ServerError> {
        let request: AtlasCreateDbUserRequest = parse_args(args)?;
        let api = atlas_api(ctx)?;

        let password = request
            .password
            .unwrap_or_else(Self::generate_password);
        let roles = if request.roles.is_empty() {
            vec![DatabaseRole {
                role_name: "readWriteAnyDatabase".to_string(),
                database_name: "admin".to_string(),
            }]
        } else {
            request.roles
        };
        let delete_after = request.temporary.then(|| {
            temporary_user_expiry(ctx.config.atlas_temporary_database_user_lifetime_ms)
        });

        api.create_db_user(
            &request.project_id,
            DbUserSpec {
                username: request.username.clone(),
                password: password.clone(),
                roles,
                delete_after,
            },
        )
        .await?;

        let mut blocks = vec![format!(
            "Created database user '{}' in project {}.",
            request.username, request.project_id
        )];
        if let Some(expiry) = delete_after {
            blocks.push(format!("The user expires at {}.", expiry.to_rfc3339()));
        }
        blocks.push(format!("Password: {password}"));
        Ok(ToolOutput::texts(blocks))
    }
}
