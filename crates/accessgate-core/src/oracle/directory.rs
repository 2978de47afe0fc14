//! Membership oracle backed by an HTTP directory service.
//!
//! Each `Group` maps to a directory object id. A check is
//! `GET {base_url}/groups/{object_id}/members/{principal_id}`:
//! `200`/`204` means member, `404` means not a member, anything else is an
//! infrastructure failure.

use super::MembershipOracle;
use crate::config::DirectoryConfig;
use crate::context::CallContext;
use crate::errors::{ConfigError, OracleError};
use crate::group::Group;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Clone)]
pub struct DirectoryOracle {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    groups: BTreeMap<Group, String>,
}

impl DirectoryOracle {
    pub fn new(config: &DirectoryConfig) -> Result<Self, ConfigError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                value: config.base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            groups: config.groups.clone(),
        })
    }

    fn member_url(&self, group: Group, object_id: &str, principal_id: &str) -> Result<Url, OracleError> {
        // `extend` drops dot segments, which would turn the request into the roster endpoint.
        for (what, segment) in [("group id", object_id), ("principal id", principal_id)] {
            if matches!(segment, "" | "." | "..") {
                return Err(OracleError::Unavailable {
                    group,
                    reason: format!("{} '{}' is not a valid path segment", what, segment),
                });
            }
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OracleError::Unavailable {
                group,
                reason: format!("directory url '{}' cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["groups", object_id, "members", principal_id]);
        Ok(url)
    }
}

#[async_trait]
impl MembershipOracle for DirectoryOracle {
    async fn is_member(&self, group: Group, ctx: &CallContext) -> Result<bool, OracleError> {
        let object_id = self
            .groups
            .get(&group)
            .ok_or(OracleError::Unmapped { group })?;
        let url = self.member_url(group, object_id, &ctx.principal().id)?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|source| OracleError::Http { group, source })?;
        let status = response.status();
        tracing::debug!(
            group = %group,
            call_id = ctx.call_id(),
            status = status.as_u16(),
            "directory membership response"
        );

        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(OracleError::Unavailable {
                group,
                reason: format!("directory answered {}", other),
            }),
        }
    }
}
