use serde::{Deserialize, Serialize};

/// The signed-in client as the backend reports them.
///
/// `name` is the backend record id; `client_name` is the display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ClientProfile {
    pub name: String,
    pub client_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// Avatar image URL; may be relative to the API host.
    pub image: Option<String>,
}

impl ClientProfile {
    /// Display name, falling back to the record id.
    pub fn display_name(&self) -> &str {
        self.client_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        let profile = ClientProfile {
            name: "CL-0042".to_string(),
            client_name: None,
            email: None,
            mobile: None,
            image: None,
        };
        assert_eq!(profile.display_name(), "CL-0042");
    }

    #[test]
    fn test_parse_profile() {
        let json = r#"{"name":"CL-0042","client_name":"Dana Fields","email":"dana@example.com","image":"/files/dana.jpg"}"#;
        let profile: ClientProfile = serde_json::from_str(json).expect("parse profile");
        assert_eq!(profile.display_name(), "Dana Fields");
        assert_eq!(profile.mobile, None);
        assert_eq!(profile.image.as_deref(), Some("/files/dana.jpg"));
    }
}
