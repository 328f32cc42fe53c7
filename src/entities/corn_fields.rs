//! SeaORM Entity for farmer-registered corn fields

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "corn_fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owner; matches the `userId` claim of the registering token
    pub user_id: String,
    pub field_name: String,
    pub location: String,
    pub soil_type: String,
    pub corn_variety: String,
    pub planting_date: Date,
    pub growth_stage: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
