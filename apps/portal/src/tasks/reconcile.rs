use crate::{proposals::reader::ProposalReader, store};
use anyhow::Result;
use sea_orm::DatabaseConnection;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::time;
use tracing::{error, info, instrument, warn};

#[instrument(name = "run_periodic_mirror_reconcile", skip_all)]
pub async fn run_periodic_mirror_reconcile(
    reader: Arc<ProposalReader>,
    db: DatabaseConnection,
    every: Duration,
) -> Result<()> {
    info!("Starting periodic task for mirror reconciliation.");
    let mut interval = time::interval(every);

    loop {
        interval.tick().await;

        match reconcile_missing(&reader, &db).await {
            Ok(0) => {}
            Ok(backfilled) => info!(backfilled, "Backfilled missing mirror rows"),
            Err(e) => error!(error = ?e, "Mirror reconciliation pass failed"),
        }
    }
}

/// Backfill mirror rows for proposal ids the chain knows but the mirror does
/// not. Repairs both missed creations and swallowed mirror-write failures
/// from confirmed transactions.
#[instrument(skip_all)]
pub async fn reconcile_missing(reader: &ProposalReader, db: &DatabaseConnection) -> Result<usize> {
    let latest = reader.latest_proposal_id().await?;
    let known: HashSet<i64> = store::proposals::get_all(db)
        .await?
        .into_iter()
        .map(|p| p.model.proposal_id)
        .collect();

    let mut backfilled = 0;
    for id in 1..=latest {
        if known.contains(&(id as i64)) {
            continue;
        }
        let Some(resolved) = reader.resolve(id).await else {
            warn!(proposal_id = id, "Proposal known to the chain but unresolvable");
            continue;
        };
        let new = store::proposals::NewProposal {
            proposal_id: resolved.proposal_id as i64,
            lot_size: resolved.lot_size,
            share_price: resolved.share_price,
            max_per_investor: resolved.max_per_investor,
            proposal_summary: resolved.proposal_summary.clone(),
            creator_address: resolved.creator_address.clone(),
            deadline: resolved.deadline,
            transaction_hash: resolved.transaction_hash.clone(),
        };
        if let Err(err) = store::proposals::upsert_proposal(db, &new).await {
            warn!(proposal_id = id, error = %err, "Backfill write failed, will retry next pass");
            continue;
        }
        backfilled += 1;
    }

    Ok(backfilled)
}
