use crate::entities::user_entity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    #[schema(example = "5551234567")]
    pub phone: String,
    #[schema(example = "Alex")]
    pub name: Option<String>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            phone: m.phone,
            name: m.name,
        }
    }
}
