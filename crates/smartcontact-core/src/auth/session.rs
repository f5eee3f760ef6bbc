use std::fmt;

use serde::{Deserialize, Serialize};

/// User record as exposed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// An authenticated session: bearer token plus the user it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

// Keep the token out of logs and panic messages
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::new(
            "secret-token",
            User {
                id: "1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        );
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn test_user_json_shape() {
        let user: User =
            serde_json::from_str(r#"{"id":"abc","name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(user.id, "abc");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "ada@example.com");
    }
}
