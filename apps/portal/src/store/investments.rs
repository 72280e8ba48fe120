use anyhow::{Context, Result};
use assetdao_db::models::{investment, sea_orm_active_enums::InvestmentStatus};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::instrument;

/// A confirmed lot purchase, written once after the buy transaction lands.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub investor_address: String,
    pub proposal_id: i64,
    pub lots: i64,
    pub lot_price: f64,
    pub total_amount: f64,
    pub transaction_hash: String,
    pub purchase_date: NaiveDateTime,
}

#[instrument(skip(db, new), fields(proposal_id = new.proposal_id))]
pub async fn record(db: &DatabaseConnection, new: &NewInvestment) -> Result<()> {
    let now = Utc::now().naive_utc();
    let model = investment::ActiveModel {
        id: NotSet,
        investor_address: Set(new.investor_address.to_lowercase()),
        proposal_id: Set(new.proposal_id),
        lots: Set(new.lots),
        lot_price: Set(new.lot_price),
        total_amount: Set(new.total_amount),
        transaction_hash: Set(new.transaction_hash.clone()),
        status: Set(InvestmentStatus::Active),
        purchase_date: Set(new.purchase_date),
        created_at: Set(now),
        updated_at: Set(now),
    };

    investment::Entity::insert(model)
        .exec(db)
        .await
        .context("Failed to insert investment record")?;

    Ok(())
}

#[instrument(skip(db))]
pub async fn list_for_investor(
    db: &DatabaseConnection,
    investor_address: &str,
) -> Result<Vec<investment::Model>> {
    investment::Entity::find()
        .filter(investment::Column::InvestorAddress.eq(investor_address.to_lowercase()))
        .order_by_desc(investment::Column::PurchaseDate)
        .all(db)
        .await
        .context("Failed to fetch investments for investor")
}

#[instrument(skip(db))]
pub async fn list_for_proposal(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<Vec<investment::Model>> {
    investment::Entity::find()
        .filter(investment::Column::ProposalId.eq(proposal_id))
        .order_by_desc(investment::Column::PurchaseDate)
        .all(db)
        .await
        .context("Failed to fetch investments for proposal")
}

/// Status is the only mutable field of an investment record.
#[instrument(skip(db))]
pub async fn update_status(
    db: &DatabaseConnection,
    investment_id: i32,
    status: InvestmentStatus,
) -> Result<()> {
    investment::Entity::update(investment::ActiveModel {
        id: Set(investment_id),
        status: Set(status),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    })
    .exec(db)
    .await
    .context("Failed to update investment status")?;

    Ok(())
}
