use serde::Serialize;
use serde_json::Value;

use crate::error::{AuthError, Result};

/// The caller as reported by the auth provider. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileMeta {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn from_payload(raw: Value) -> Result<Self> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::InvalidPayload)?
            .to_string();
        let email = raw.get("email").and_then(Value::as_str).map(str::to_string);
        Ok(Self { id, email, raw })
    }

    /// Display name and avatar from the first linked identity, if any.
    pub fn profile_meta(&self) -> Option<ProfileMeta> {
        let data = self
            .raw
            .get("identities")?
            .as_array()?
            .first()?
            .get("identity_data")?;
        let field = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        Some(ProfileMeta {
            name: field("name").or_else(|| field("full_name")),
            avatar_url: field("avatar_url").or_else(|| field("picture")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_requires_id() {
        assert!(matches!(
            Identity::from_payload(json!({"email": "a@b.co"})),
            Err(AuthError::InvalidPayload)
        ));
        let identity = Identity::from_payload(json!({"id": "u1"})).unwrap();
        assert_eq!(identity.email, None);
    }

    #[test]
    fn test_profile_meta_from_first_identity() {
        let identity = Identity::from_payload(json!({
            "id": "u1",
            "email": "a@b.co",
            "identities": [
                {"identity_data": {"full_name": "Ada", "picture": "https://img/a.png"}},
                {"identity_data": {"name": "Other"}}
            ]
        }))
        .unwrap();
        let meta = identity.profile_meta().unwrap();
        assert_eq!(meta.name.as_deref(), Some("Ada"));
        assert_eq!(meta.avatar_url.as_deref(), Some("https://img/a.png"));

        let bare = Identity::from_payload(json!({"id": "u2", "identities": []})).unwrap();
        assert_eq!(bare.profile_meta(), None);
    }
}
