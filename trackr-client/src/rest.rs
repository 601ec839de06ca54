//! REST transport for the remote tracker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use trackr_core::{
    CommandApplier, FieldFetcher, IssueId, Member, MemberFetcher, ProjectField, ProjectId,
    TransportError, UserLookup,
};

use crate::wire::{
    CommandRequest, IssueRef, ProjectCustomFieldDto, RemoteErrorDto, UserDto, CUSTOM_FIELD_FIELDS,
    MEMBER_FIELDS,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
}

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Permanent token sent as a bearer credential.
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    auth_header: HeaderMap,
    request_timeout: Duration,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let base = config.base_url.trim_end_matches('/');
        let base_url = Url::parse(base)
            .map_err(|e| ClientError::Config(format!("invalid base_url {}: {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!("base_url {} cannot hold paths", base)));
        }

        Ok(Self {
            client,
            base_url,
            auth_header: build_auth_headers(config.token.as_deref())?,
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T, Q>(
        &self,
        operation: &str,
        url: Url,
        query: &Q,
    ) -> Result<T, TransportError>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        tracing::debug!(operation, url = %url, "GET");
        let response = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;
        self.parse_response(operation, response).await
    }

    async fn post_json<B>(&self, operation: &str, url: Url, body: &B) -> Result<(), TransportError>
    where
        B: serde::Serialize + ?Sized,
    {
        tracing::debug!(operation, url = %url, "POST");
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response
            .text()
            .await
            .map_err(|e| self.request_error(operation, e))?;
        Err(http_error(operation, status, &text))
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| TransportError::Decode {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
        } else {
            Err(http_error(operation, status, &text))
        }
    }

    fn request_error(&self, operation: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                operation: operation.to_string(),
                elapsed_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                operation: operation.to_string(),
                reason: err.to_string(),
            }
        } else {
            TransportError::Network {
                operation: operation.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

fn http_error(operation: &str, status: StatusCode, body: &str) -> TransportError {
    let message = match serde_json::from_str::<RemoteErrorDto>(body) {
        Ok(remote) => remote.message(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    TransportError::Http {
        operation: operation.to_string(),
        status: status.as_u16(),
        message,
    }
}

fn build_auth_headers(token: Option<&str>) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/json"),
    );
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ClientError::Config(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static("authorization"), value);
    }
    Ok(headers)
}

#[async_trait]
impl MemberFetcher for RestClient {
    async fn fetch_members(
        &self,
        project: &ProjectId,
        skip: usize,
        top: usize,
    ) -> Result<Vec<Member>, TransportError> {
        let url = self.endpoint(&["api", "admin", "projects", project.as_str(), "team", "users"]);
        let query = [
            ("fields", MEMBER_FIELDS.to_string()),
            ("$skip", skip.to_string()),
            ("$top", top.to_string()),
        ];
        let users: Vec<UserDto> = self.get_json("list_members", url, &query).await?;
        Ok(users.into_iter().map(Member::from).collect())
    }
}

#[async_trait]
impl FieldFetcher for RestClient {
    async fn fetch_project_fields(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<ProjectField>, TransportError> {
        let url = self.endpoint(&["api", "admin", "projects", project.as_str(), "customFields"]);
        let query = [("fields", CUSTOM_FIELD_FIELDS)];
        let fields: Vec<ProjectCustomFieldDto> =
            self.get_json("list_project_fields", url, &query).await?;
        Ok(fields.into_iter().map(ProjectField::from).collect())
    }
}

#[async_trait]
impl UserLookup for RestClient {
    async fn get_user(&self, login: &str) -> Result<Option<Member>, TransportError> {
        let url = self.endpoint(&["api", "users", login]);
        let query = [("fields", MEMBER_FIELDS)];
        match self.get_json::<UserDto, _>("get_user", url, &query).await {
            Ok(user) => Ok(Some(user.into())),
            Err(TransportError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CommandApplier for RestClient {
    async fn apply_command(&self, issue: &IssueId, command: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&["api", "commands"]);
        let body = CommandRequest {
            query: command,
            issues: vec![IssueRef {
                id_readable: issue.as_str(),
            }],
        };
        self.post_json("apply_command", url, &body).await?;
        tracing::info!(issue = %issue, "Applied command");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::new(&ClientConfig::new(base).with_token("perm:abc")).unwrap()
    }

    #[test]
    fn test_endpoint_joins_onto_base_path() {
        let client = client("https://tracker.example.com/youtrack/");
        let url = client.endpoint(&["api", "admin", "projects", "DEMO", "team", "users"]);
        assert_eq!(
            url.as_str(),
            "https://tracker.example.com/youtrack/api/admin/projects/DEMO/team/users"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client("https://tracker.example.com");
        let url = client.endpoint(&["api", "users", "ann kim/ops"]);
        assert_eq!(url.as_str(), "https://tracker.example.com/api/users/ann%20kim%2Fops");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            RestClient::new(&ClientConfig::new("not a url")),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            RestClient::new(&ClientConfig::new("mailto:ops@example.com")),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_auth_header_is_bearer_and_sensitive() {
        let headers = build_auth_headers(Some("perm:abc")).unwrap();
        let value = headers.get("authorization").unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer perm:abc");
        assert!(value.is_sensitive());

        assert!(build_auth_headers(None).unwrap().get("authorization").is_none());
        assert!(build_auth_headers(Some("")).unwrap().get("authorization").is_none());
    }

    #[test]
    fn test_http_error_messages() {
        let remote = http_error(
            "list_members",
            StatusCode::FORBIDDEN,
            r#"{"error":"Forbidden","error_description":"No access to DEMO"}"#,
        );
        assert_eq!(
            remote,
            TransportError::Http {
                operation: "list_members".to_string(),
                status: 403,
                message: "Forbidden: No access to DEMO".to_string(),
            }
        );

        let empty = http_error("get_user", StatusCode::BAD_GATEWAY, "");
        assert!(matches!(
            empty,
            TransportError::Http { status: 502, ref message, .. } if message == "Bad Gateway"
        ));

        let plain = http_error("apply_command", StatusCode::BAD_REQUEST, " bad command \n");
        assert!(matches!(
            plain,
            TransportError::Http { ref message, .. } if message == "bad command"
        ));
    }
}
