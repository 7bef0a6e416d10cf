use uuid::Uuid;
use crate::db::PortfolioStore;
use crate::errors::AppError;
use crate::models::{CreateTag, Tag, UpdateTag};

pub(crate) fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Tag name cannot be empty".into()));
    }
    Ok(name.to_string())
}

pub async fn create(store: &dyn PortfolioStore, input: CreateTag) -> Result<Tag, AppError> {
    let name = validate_name(&input.name)?;
    store.create_tag(&name).await
}

pub async fn fetch_all(store: &dyn PortfolioStore) -> Result<Vec<Tag>, AppError> {
    store.list_tags().await
}

pub async fn fetch_one(store: &dyn PortfolioStore, id: Uuid) -> Result<Tag, AppError> {
    store.fetch_tag(id).await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
}

pub async fn update(store: &dyn PortfolioStore, id: Uuid, input: UpdateTag) -> Result<Tag, AppError> {
    let name = validate_name(&input.name)?;
    store.rename_tag(id, &name).await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
}

pub async fn delete(store: &dyn PortfolioStore, id: Uuid) -> Result<(), AppError> {
    if !store.delete_tag(id).await? {
        return Err(AppError::NotFound("Tag not found".to_string()));
    }
    Ok(())
}
