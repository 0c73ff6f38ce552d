//! Role domain model.

use serde::{Deserialize, Serialize};

/// Role assigned to every account at signup.
pub const ROLE_USER: &str = "ROLE_USER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
}
