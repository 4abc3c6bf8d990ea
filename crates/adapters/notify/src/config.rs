//! Notifier configuration.

use serde::Deserialize;

/// Callback endpoint settings for one linked skill/user pair.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Skill id assigned by the platform.
    pub skill_id: String,
    /// User id the pushes are attributed to.
    pub user_id: String,
    /// OAuth token authorizing callback calls.
    pub token: String,
    /// Callback API root; override for tests or self-hosted stacks.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://dialogs.yandex.net/api/v1/skills".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_base_url() {
        let config: NotifierConfig = serde_json::from_value(serde_json::json!({
            "skill_id": "skill-1",
            "user_id": "user-1",
            "token": "secret",
        }))
        .unwrap();
        assert_eq!(config.base_url, "https://dialogs.yandex.net/api/v1/skills");
    }

    #[test]
    fn should_keep_configured_base_url() {
        let config: NotifierConfig = serde_json::from_value(serde_json::json!({
            "skill_id": "skill-1",
            "user_id": "user-1",
            "token": "secret",
            "base_url": "http://localhost:9000/api",
        }))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/api");
    }
}
