use anyhow::{Context, Result};
use assetdao_db::models::dao_member;
use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use tracing::instrument;

#[instrument(skip(db))]
pub async fn get(db: &DatabaseConnection, address: &str) -> Result<Option<dao_member::Model>> {
    dao_member::Entity::find()
        .filter(dao_member::Column::WalletAddress.eq(address.to_lowercase()))
        .one(db)
        .await
        .context("Failed to fetch member record")
}

/// Insert or refresh the cached membership flag for an address. Addresses
/// are stored lowercase so lookups are case-insensitive.
#[instrument(skip(db))]
pub async fn upsert(db: &DatabaseConnection, address: &str, is_member: bool) -> Result<()> {
    let model = dao_member::ActiveModel {
        id: NotSet,
        wallet_address: Set(address.to_lowercase()),
        is_member: Set(is_member),
        updated_at: Set(Utc::now().naive_utc()),
    };

    dao_member::Entity::insert(model)
        .on_conflict(
            OnConflict::column(dao_member::Column::WalletAddress)
                .update_columns([
                    dao_member::Column::IsMember,
                    dao_member::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await
        .context("Failed to upsert member record")?;

    Ok(())
}
