//! Data source configuration
//!
//! Settings arrive either as the host's `jsonData` blob plus a decrypted
//! secrets map (`SdsSettings::from_json`) or from `SDS_*` environment
//! variables (`SdsSettings::from_env`, used by the CLI).

use crate::sds::{Addressing, Credentials, DecodePolicy, Result, Scope, SdsError};
use serde::Deserialize;
use std::collections::HashMap;

/// Base-path convention selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingMode {
    /// `/api/<ver>/tenants/<tenant>/namespaces|communities/<id>`
    #[default]
    Tenant,
    /// `/api/account/<account>/sds/<sdsId>/<ver>`
    Account,
}

impl AddressingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tenant" | "" => Some(Self::Tenant),
            "account" => Some(Self::Account),
            _ => None,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SdsSettings {
    /// Platform URL, e.g. `https://uswe.datahub.connect.aveva.com`
    pub resource: String,

    pub api_version: String,

    pub addressing: AddressingMode,

    pub tenant_id: String,

    /// Legacy name for the tenant id; used when `tenant_id` is empty
    pub account_id: String,

    pub namespace_id: String,

    pub use_community: bool,

    pub community_id: String,

    /// SDS id under the account (account addressing only)
    pub sds_id: String,

    pub client_id: String,

    /// Loaded from the decrypted secrets map, never from `jsonData`
    #[serde(skip)]
    pub client_secret: String,

    /// Use the caller's `Authorization` header instead of client credentials
    pub oauth_pass_thru: bool,

    pub decode_policy: DecodePolicy,

    /// Overrides the identity endpoint derived from `resource`
    pub token_endpoint: Option<String>,
}

impl Default for SdsSettings {
    fn default() -> Self {
        SdsSettings {
            resource: String::new(),
            api_version: "v1".to_string(),
            addressing: AddressingMode::default(),
            tenant_id: String::new(),
            account_id: String::new(),
            namespace_id: String::new(),
            use_community: false,
            community_id: String::new(),
            sds_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            oauth_pass_thru: false,
            decode_policy: DecodePolicy::default(),
            token_endpoint: None,
        }
    }
}

impl std::fmt::Debug for SdsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdsSettings")
            .field("resource", &self.resource)
            .field("api_version", &self.api_version)
            .field("addressing", &self.addressing)
            .field("tenant_id", &self.owner_id())
            .field("namespace_id", &self.namespace_id)
            .field("use_community", &self.use_community)
            .field("community_id", &self.community_id)
            .field("sds_id", &self.sds_id)
            .field("client_id", &self.client_id)
            .field("oauth_pass_thru", &self.oauth_pass_thru)
            .field("decode_policy", &self.decode_policy)
            .field("token_endpoint", &self.token_endpoint)
            .finish_non_exhaustive()
    }
}

impl SdsSettings {
    /// Load from the host's JSON settings and decrypted secrets
    pub fn from_json(json_data: &[u8], secrets: &HashMap<String, String>) -> Result<Self> {
        let mut settings: SdsSettings = serde_json::from_slice(json_data).map_err(|e| {
            SdsError::Config(format!("could not unmarshal settings json: {}", e))
        })?;
        settings.client_secret = secrets.get("clientSecret").cloned().unwrap_or_default();
        Ok(settings)
    }

    /// Load from `SDS_*` environment variables
    ///
    /// Required: `SDS_RESOURCE` plus the ids for the chosen addressing.
    /// Optional: `SDS_API_VERSION`, `SDS_ADDRESSING`, `SDS_USE_COMMUNITY`,
    /// `SDS_OAUTH_PASS_THRU`, `SDS_DECODE_POLICY`, `SDS_TOKEN_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key → value source using the `SDS_*` names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let defaults = SdsSettings::default();

        let addressing = match lookup("SDS_ADDRESSING") {
            Some(raw) => AddressingMode::parse(&raw).ok_or_else(|| {
                SdsError::Config(format!("SDS_ADDRESSING must be tenant or account, got '{}'", raw))
            })?,
            None => defaults.addressing,
        };

        let decode_policy = match lookup("SDS_DECODE_POLICY") {
            Some(raw) => DecodePolicy::parse(&raw).ok_or_else(|| {
                SdsError::Config(format!(
                    "SDS_DECODE_POLICY must be lenient or strict, got '{}'",
                    raw
                ))
            })?,
            None => defaults.decode_policy,
        };

        Ok(SdsSettings {
            resource: get("SDS_RESOURCE"),
            api_version: lookup("SDS_API_VERSION")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_version),
            addressing,
            tenant_id: get("SDS_TENANT_ID"),
            account_id: get("SDS_ACCOUNT_ID"),
            namespace_id: get("SDS_NAMESPACE_ID"),
            use_community: parse_bool("SDS_USE_COMMUNITY", lookup("SDS_USE_COMMUNITY"))?,
            community_id: get("SDS_COMMUNITY_ID"),
            sds_id: get("SDS_SDS_ID"),
            client_id: get("SDS_CLIENT_ID"),
            client_secret: get("SDS_CLIENT_SECRET"),
            oauth_pass_thru: parse_bool("SDS_OAUTH_PASS_THRU", lookup("SDS_OAUTH_PASS_THRU"))?,
            decode_policy,
            token_endpoint: lookup("SDS_TOKEN_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }

    /// Tenant id, falling back to the legacy account id
    pub fn owner_id(&self) -> &str {
        if self.tenant_id.is_empty() {
            &self.account_id
        } else {
            &self.tenant_id
        }
    }

    /// Build the addressing value for the configured mode
    pub fn addressing(&self) -> Result<Addressing> {
        let owner = self.owner_id();
        if owner.is_empty() {
            return Err(SdsError::Config("tenantId (or accountId) is required".into()));
        }

        match self.addressing {
            AddressingMode::Account => {
                if self.sds_id.is_empty() {
                    return Err(SdsError::Config(
                        "sdsId is required for account addressing".into(),
                    ));
                }
                Ok(Addressing::Account {
                    account_id: owner.to_string(),
                    sds_id: self.sds_id.clone(),
                })
            }
            AddressingMode::Tenant => {
                let scope = if self.use_community {
                    if self.community_id.is_empty() {
                        return Err(SdsError::Config(
                            "communityId is required when useCommunity is set".into(),
                        ));
                    }
                    Scope::Community(self.community_id.clone())
                } else {
                    if self.namespace_id.is_empty() {
                        return Err(SdsError::Config("namespaceId is required".into()));
                    }
                    Scope::Namespace(self.namespace_id.clone())
                };
                Ok(Addressing::Tenant {
                    tenant_id: owner.to_string(),
                    scope,
                })
            }
        }
    }

    /// Check everything needed to build a data source
    pub fn validate(&self) -> Result<()> {
        if self.resource.trim().is_empty() {
            return Err(SdsError::Config("resource is required".into()));
        }
        if self.api_version.trim().is_empty() {
            return Err(SdsError::Config("apiVersion is required".into()));
        }
        self.addressing()?;
        if !self.oauth_pass_thru {
            if self.client_id.is_empty() {
                return Err(SdsError::Config("clientId is required".into()));
            }
            if self.client_secret.is_empty() {
                return Err(SdsError::Config("clientSecret is required".into()));
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            owner_id: self.owner_id().to_string(),
            resource: self.resource.clone(),
            token_endpoint: self.token_endpoint.clone(),
        }
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) if v.is_empty() || v == "false" || v == "0" => Ok(false),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(other) => Err(SdsError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}
