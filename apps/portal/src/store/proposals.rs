use crate::proposals::status::{ProposalStatus, derive_status};
use anyhow::{Context, Result};
use assetdao_db::models::dao_proposal;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, sea_query::OnConflict,
};
use tracing::instrument;
use utils::errors::PROPOSAL_NOT_FOUND_ERROR;

/// Fields known at creation time. Vote counters and the executed flag have
/// their own update paths and always start zeroed/false.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProposal {
    pub proposal_id: i64,
    pub lot_size: i64,
    pub share_price: f64,
    pub max_per_investor: i64,
    pub proposal_summary: String,
    pub creator_address: String,
    pub deadline: NaiveDateTime,
    pub transaction_hash: Option<String>,
}

/// A mirror row together with its derived status.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalWithStatus {
    pub model: dao_proposal::Model,
    pub status: ProposalStatus,
}

/// Build the insert row for a creation upsert. Separated out so the shape
/// of a fresh mirror record is testable without a connection.
pub fn creation_model(new: &NewProposal, now: NaiveDateTime) -> dao_proposal::ActiveModel {
    dao_proposal::ActiveModel {
        id: NotSet,
        proposal_id: Set(new.proposal_id),
        lot_size: Set(new.lot_size),
        share_price: Set(new.share_price),
        max_per_investor: Set(new.max_per_investor),
        proposal_summary: Set(new.proposal_summary.clone()),
        creator_address: Set(new.creator_address.to_lowercase()),
        deadline: Set(new.deadline),
        yay_votes: Set(0),
        nay_votes: Set(0),
        executed: Set(false),
        transaction_hash: Set(new.transaction_hash.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Idempotent write keyed by the contract-assigned `proposal_id`. A re-run
/// for an id refreshes the descriptive fields; counters and the executed
/// flag are left to their own update paths.
#[instrument(skip(db, new), fields(proposal_id = new.proposal_id))]
pub async fn upsert_proposal(db: &DatabaseConnection, new: &NewProposal) -> Result<()> {
    let model = creation_model(new, Utc::now().naive_utc());

    dao_proposal::Entity::insert(model)
        .on_conflict(
            OnConflict::column(dao_proposal::Column::ProposalId)
                .update_columns([
                    dao_proposal::Column::LotSize,
                    dao_proposal::Column::SharePrice,
                    dao_proposal::Column::MaxPerInvestor,
                    dao_proposal::Column::ProposalSummary,
                    dao_proposal::Column::CreatorAddress,
                    dao_proposal::Column::Deadline,
                    dao_proposal::Column::TransactionHash,
                    dao_proposal::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await
        .context("Failed to upsert proposal record")?;

    Ok(())
}

/// Full replace of both counters. Callers supply the complete new totals;
/// the last writer wins.
#[instrument(skip(db))]
pub async fn update_votes(
    db: &DatabaseConnection,
    proposal_id: i64,
    yay: i64,
    nay: i64,
) -> Result<()> {
    let existing = dao_proposal::Entity::find()
        .filter(dao_proposal::Column::ProposalId.eq(proposal_id))
        .one(db)
        .await
        .context("Failed to fetch proposal record")?
        .context(PROPOSAL_NOT_FOUND_ERROR)?;

    dao_proposal::Entity::update(dao_proposal::ActiveModel {
        id: Set(existing.id),
        yay_votes: Set(yay),
        nay_votes: Set(nay),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    })
    .exec(db)
    .await
    .context("Failed to update vote counters")?;

    Ok(())
}

/// Set the executed flag. The store enforces no transition rules; the flag
/// follows chain truth, which only ever moves false to true.
#[instrument(skip(db))]
pub async fn update_execution(
    db: &DatabaseConnection,
    proposal_id: i64,
    executed: bool,
) -> Result<()> {
    let existing = dao_proposal::Entity::find()
        .filter(dao_proposal::Column::ProposalId.eq(proposal_id))
        .one(db)
        .await
        .context("Failed to fetch proposal record")?
        .context(PROPOSAL_NOT_FOUND_ERROR)?;

    dao_proposal::Entity::update(dao_proposal::ActiveModel {
        id: Set(existing.id),
        executed: Set(executed),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    })
    .exec(db)
    .await
    .context("Failed to update execution flag")?;

    Ok(())
}

#[instrument(skip(db))]
pub async fn get_by_id(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<Option<ProposalWithStatus>> {
    let now = Utc::now().naive_utc();
    let found = dao_proposal::Entity::find()
        .filter(dao_proposal::Column::ProposalId.eq(proposal_id))
        .one(db)
        .await
        .context("Failed to fetch proposal record")?;

    Ok(found.map(|model| with_status(model, now)))
}

#[instrument(skip(db))]
pub async fn get_all(db: &DatabaseConnection) -> Result<Vec<ProposalWithStatus>> {
    let now = Utc::now().naive_utc();
    let rows = dao_proposal::Entity::find()
        .order_by_desc(dao_proposal::Column::ProposalId)
        .all(db)
        .await
        .context("Failed to fetch proposal records")?;

    Ok(rows
        .into_iter()
        .map(|model| with_status(model, now))
        .collect())
}

fn with_status(model: dao_proposal::Model, now: NaiveDateTime) -> ProposalWithStatus {
    let status = derive_status(model.deadline, model.executed, now);
    ProposalWithStatus { model, status }
}
