pub mod reader;
pub mod status;

use assetdao_db::models::dao_proposal;
use chrono::NaiveDateTime;
use status::{ProposalStatus, derive_status};

/// Which source a resolved proposal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Mirror,
    ContractStruct,
    EventReplay,
}

/// A proposal resolved from any source. Event-replay reconstructions carry
/// zeroed counters and financial terms since the creation event does not
/// include them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProposal {
    pub proposal_id: u64,
    pub lot_size: i64,
    pub share_price: f64,
    pub max_per_investor: i64,
    pub proposal_summary: String,
    pub creator_address: String,
    pub deadline: NaiveDateTime,
    pub yay_votes: i64,
    pub nay_votes: i64,
    pub executed: bool,
    pub transaction_hash: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub source: SourceKind,
}

impl ResolvedProposal {
    pub fn status(&self, now: NaiveDateTime) -> ProposalStatus {
        derive_status(self.deadline, self.executed, now)
    }
}

impl From<dao_proposal::Model> for ResolvedProposal {
    fn from(model: dao_proposal::Model) -> Self {
        Self {
            proposal_id: model.proposal_id as u64,
            lot_size: model.lot_size,
            share_price: model.share_price,
            max_per_investor: model.max_per_investor,
            proposal_summary: model.proposal_summary,
            creator_address: model.creator_address,
            deadline: model.deadline,
            yay_votes: model.yay_votes,
            nay_votes: model.nay_votes,
            executed: model.executed,
            transaction_hash: model.transaction_hash,
            created_at: Some(model.created_at),
            source: SourceKind::Mirror,
        }
    }
}
