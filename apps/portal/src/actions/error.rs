use crate::chain::error::ChainError;
use alloy::primitives::U256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("address is already a DAO member")]
    AlreadyMember,
    #[error("caller is not a DAO member")]
    NotMember,
    #[error("voting deadline has passed")]
    DeadlinePassed,
    #[error("address has already voted on this proposal")]
    AlreadyVoted,
    #[error("proposal has already been executed")]
    AlreadyExecuted,
    #[error("proposal id {id} out of range (1..={max})")]
    ProposalOutOfRange { id: u64, max: u64 },
    #[error("insufficient token balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },
    #[error("transaction failed: {0}")]
    Reverted(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Map well-known revert reasons onto specific user-facing errors. Anything
/// unrecognized keeps the verbatim reason.
pub fn translate_revert(reason: &str) -> ActionError {
    let lower = reason.to_lowercase();
    if lower.contains("already voted") {
        ActionError::AlreadyVoted
    } else if lower.contains("already executed") {
        ActionError::AlreadyExecuted
    } else if lower.contains("deadline") {
        ActionError::DeadlinePassed
    } else if lower.contains("not a member") || lower.contains("onlymember") {
        ActionError::NotMember
    } else {
        ActionError::Reverted(reason.to_string())
    }
}

/// Proposal ids are contract-assigned, 1-indexed and dense: anything outside
/// `1..=numProposal()` cannot exist.
pub fn validate_proposal_in_range(proposal_id: u64, num_proposals: u64) -> Result<(), ActionError> {
    if proposal_id == 0 || proposal_id > num_proposals {
        return Err(ActionError::ProposalOutOfRange {
            id: proposal_id,
            max: num_proposals,
        });
    }
    Ok(())
}
