//! Request path conventions
//!
//! Two base-path layouts coexist on the platform:
//! - Account (legacy): `<resource>/api/account/<accountId>/sds/<sdsId>/<apiVersion>`
//! - Tenant: `<resource>/api/<apiVersion>/tenants/<tenantId>/namespaces/<id>`
//!   or `.../communities/<id>`
//!
//! Everything else (streams, types, data) hangs off the base path identically.

use urlencoding::encode;

/// Scoping container under a tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Namespace(String),
    Community(String),
}

/// Which base-path convention requests use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    Account { account_id: String, sds_id: String },
    Tenant { tenant_id: String, scope: Scope },
}

impl Addressing {
    /// Account or tenant id; also selects the identity endpoint
    pub fn owner_id(&self) -> &str {
        match self {
            Addressing::Account { account_id, .. } => account_id,
            Addressing::Tenant { tenant_id, .. } => tenant_id,
        }
    }

    /// Base path for all collection requests
    pub fn base_path(&self, resource: &str, api_version: &str) -> String {
        let resource = resource.trim_end_matches('/');
        match self {
            Addressing::Account { account_id, sds_id } => format!(
                "{}/api/account/{}/sds/{}/{}",
                resource,
                encode(account_id),
                encode(sds_id),
                api_version
            ),
            Addressing::Tenant { tenant_id, scope } => {
                let (kind, id) = match scope {
                    Scope::Namespace(id) => ("namespaces", id),
                    Scope::Community(id) => ("communities", id),
                };
                format!(
                    "{}/api/{}/tenants/{}/{}/{}",
                    resource,
                    api_version,
                    encode(tenant_id),
                    kind,
                    encode(id)
                )
            }
        }
    }

    /// Lightweight GET used by the health check
    pub fn health_path(&self, resource: &str, api_version: &str) -> String {
        let base = self.base_path(resource, api_version);
        match self {
            Addressing::Account { .. } => format!("{}/streams", base),
            Addressing::Tenant { .. } => base,
        }
    }
}
