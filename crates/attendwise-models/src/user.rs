use serde::{Deserialize, Serialize};

/// An authenticated user. Anonymous visitors are `Option::<User>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub face_id_enrolled: bool,
}
