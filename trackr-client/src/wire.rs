//! Remote JSON shapes and their mapping onto core types.

use serde::{Deserialize, Serialize};
use trackr_core::{AllowedValue, FieldKind, Member, ProjectField};

/// Field projection requested for team members.
pub const MEMBER_FIELDS: &str = "login,fullName,email";

/// Field projection requested for project custom fields.
pub const CUSTOM_FIELD_FIELDS: &str = "$type,field(name),bundle(values(id,name))";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub login: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserDto> for Member {
    fn from(user: UserDto) -> Self {
        Member {
            login: user.login,
            full_name: user.full_name.unwrap_or_default(),
            email: user.email.filter(|e| !e.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectCustomFieldDto {
    #[serde(rename = "$type")]
    pub type_tag: String,
    pub field: FieldRefDto,
    #[serde(default)]
    pub bundle: Option<BundleDto>,
}

#[derive(Debug, Deserialize)]
pub struct FieldRefDto {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BundleDto {
    #[serde(default)]
    pub values: Vec<BundleValueDto>,
}

#[derive(Debug, Deserialize)]
pub struct BundleValueDto {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

impl From<ProjectCustomFieldDto> for ProjectField {
    fn from(dto: ProjectCustomFieldDto) -> Self {
        let values = dto
            .bundle
            .unwrap_or_default()
            .values
            .into_iter()
            .map(|v| AllowedValue::new(v.id, v.name))
            .collect();
        ProjectField::new(dto.field.name, FieldKind::from_remote(&dto.type_tag, values))
    }
}

/// Body of a command application request.
#[derive(Debug, Serialize)]
pub struct CommandRequest<'a> {
    pub query: &'a str,
    pub issues: Vec<IssueRef<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRef<'a> {
    pub id_readable: &'a str,
}

/// Error body returned by the remote on failure.
#[derive(Debug, Deserialize)]
pub struct RemoteErrorDto {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl RemoteErrorDto {
    pub fn message(&self) -> String {
        match self.error_description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", self.error, description)
            }
            _ => self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackr_core::SimpleKind;

    #[test]
    fn test_user_with_nulls() {
        let user: UserDto =
            serde_json::from_str(r#"{"login":"bot","fullName":null,"email":"","$type":"User"}"#)
                .unwrap();
        let member = Member::from(user);
        assert_eq!(member.login, "bot");
        assert_eq!(member.full_name, "");
        assert_eq!(member.email, None);
    }

    #[test]
    fn test_custom_fields_decode() {
        let body = r#"[
            {"$type":"StateProjectCustomField","field":{"name":"State"},
             "bundle":{"values":[{"id":"67-0","name":"Open"},{"id":"67-2","name":"Fixed"}]}},
            {"$type":"UserProjectCustomField","field":{"name":"Assignee"},"bundle":{"values":[]}},
            {"$type":"PeriodProjectCustomField","field":{"name":"Estimation"}}
        ]"#;
        let dtos: Vec<ProjectCustomFieldDto> = serde_json::from_str(body).unwrap();
        let fields: Vec<ProjectField> = dtos.into_iter().map(ProjectField::from).collect();

        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields[0].kind,
            FieldKind::State(vec![
                AllowedValue::new("67-0", "Open"),
                AllowedValue::new("67-2", "Fixed"),
            ])
        );
        assert_eq!(fields[1].kind, FieldKind::User);
        assert_eq!(fields[2].kind, FieldKind::Simple(SimpleKind::Period));
    }

    #[test]
    fn test_command_request_shape() {
        let request = CommandRequest {
            query: "State Fixed",
            issues: vec![IssueRef {
                id_readable: "DEMO-42",
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"query": "State Fixed", "issues": [{"idReadable": "DEMO-42"}]})
        );
    }

    #[test]
    fn test_remote_error_message() {
        let err: RemoteErrorDto = serde_json::from_str(
            r#"{"error":"Not Found","error_description":"Entity with id NOPE not found"}"#,
        )
        .unwrap();
        assert_eq!(err.message(), "Not Found: Entity with id NOPE not found");
    }
}
