use crate::types::UserId;
use serde::Serialize;
use std::fmt;

/// A workspace member referenced by people properties.
///
/// Read-only from this layer's point of view; only the id is ever written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Person {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Person {
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.email) {
            (Some(name), _) => write!(f, "{}", name),
            (None, Some(email)) => write!(f, "{}", email),
            (None, None) => write!(f, "User {}", self.id),
        }
    }
}
