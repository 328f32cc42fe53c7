//! Corn field registry
//!
//! Farmers register the fields they plant; every read and write is scoped to
//! the owning user. Ownership is checked here, so handlers only pass the
//! caller's id through.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use thiserror::Error;

use crate::entities::corn_fields::{self, Entity as CornFields};

/// Stage recorded when a registration omits one
pub const DEFAULT_GROWTH_STAGE: &str = "VE";

#[derive(Error, Debug)]
pub enum CornFieldError {
    #[error("Corn field not found")]
    NotFound(i32),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Validated registration payload
#[derive(Debug, Clone)]
pub struct NewCornField {
    pub field_name: String,
    pub location: String,
    pub soil_type: String,
    pub corn_variety: String,
    pub planting_date: NaiveDate,
    pub growth_stage: Option<String>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct CornFieldChanges {
    pub field_name: Option<String>,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    pub corn_variety: Option<String>,
    pub planting_date: Option<NaiveDate>,
    pub growth_stage: Option<String>,
}

pub async fn register(
    db: &DatabaseConnection,
    owner: &str,
    field: NewCornField,
) -> Result<corn_fields::Model, CornFieldError> {
    let now = Utc::now().naive_utc();

    let model = corn_fields::ActiveModel {
        user_id: Set(owner.to_string()),
        field_name: Set(field.field_name),
        location: Set(field.location),
        soil_type: Set(field.soil_type),
        corn_variety: Set(field.corn_variety),
        planting_date: Set(field.planting_date),
        growth_stage: Set(field
            .growth_stage
            .unwrap_or_else(|| DEFAULT_GROWTH_STAGE.to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(id = model.id, user_id = owner, "Corn field registered");
    Ok(model)
}

/// Fields owned by `user_id`, newest first
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<corn_fields::Model>, CornFieldError> {
    let fields = CornFields::find()
        .filter(corn_fields::Column::UserId.eq(user_id))
        .order_by_desc(corn_fields::Column::CreatedAt)
        .order_by_desc(corn_fields::Column::Id)
        .all(db)
        .await?;

    Ok(fields)
}

/// Load a field, failing unless `caller` owns it
pub async fn get_owned(
    db: &DatabaseConnection,
    id: i32,
    caller: &str,
) -> Result<corn_fields::Model, CornFieldError> {
    let field = CornFields::find_by_id(id)
        .one(db)
        .await?
        .ok_or(CornFieldError::NotFound(id))?;

    if field.user_id != caller {
        tracing::warn!(id, caller, "Rejected access to another user's corn field");
        return Err(CornFieldError::Forbidden(
            "You do not have permission to access this corn field",
        ));
    }

    Ok(field)
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    caller: &str,
    changes: CornFieldChanges,
) -> Result<corn_fields::Model, CornFieldError> {
    let field = get_owned(db, id, caller).await?;

    let mut active_model: corn_fields::ActiveModel = field.into();
    if let Some(field_name) = changes.field_name {
        active_model.field_name = Set(field_name);
    }
    if let Some(location) = changes.location {
        active_model.location = Set(location);
    }
    if let Some(soil_type) = changes.soil_type {
        active_model.soil_type = Set(soil_type);
    }
    if let Some(corn_variety) = changes.corn_variety {
        active_model.corn_variety = Set(corn_variety);
    }
    if let Some(planting_date) = changes.planting_date {
        active_model.planting_date = Set(planting_date);
    }
    if let Some(growth_stage) = changes.growth_stage {
        active_model.growth_stage = Set(growth_stage);
    }
    active_model.updated_at = Set(Utc::now().naive_utc());

    Ok(active_model.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, id: i32, caller: &str) -> Result<(), CornFieldError> {
    let field = get_owned(db, id, caller).await?;
    field.delete(db).await?;

    tracing::info!(id, user_id = caller, "Corn field deleted");
    Ok(())
}
