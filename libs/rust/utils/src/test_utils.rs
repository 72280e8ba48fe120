use assetdao_db::models::dao_proposal;
use chrono::NaiveDateTime;

pub struct ExpectedProposal {
    pub proposal_id: i64,
    pub lot_size: i64,
    pub share_price: f64,
    pub max_per_investor: i64,
    pub summary_contains: Vec<&'static str>,
    pub creator_address: &'static str,
    pub yay_votes: i64,
    pub nay_votes: i64,
    pub executed: bool,
    pub transaction_hash: Option<&'static str>,
    pub deadline: Option<&'static str>,
}

pub fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn assert_proposal(proposal: &dao_proposal::ActiveModel, expected: &ExpectedProposal) {
    assert_eq!(
        proposal.proposal_id.clone().take().unwrap(),
        expected.proposal_id,
        "Proposal id does not match"
    );
    assert_eq!(
        proposal.lot_size.clone().take().unwrap(),
        expected.lot_size,
        "Lot size does not match"
    );
    assert_eq!(
        proposal.share_price.clone().take().unwrap(),
        expected.share_price,
        "Share price does not match"
    );
    assert_eq!(
        proposal.max_per_investor.clone().take().unwrap(),
        expected.max_per_investor,
        "Max per investor does not match"
    );

    for part in &expected.summary_contains {
        assert!(
            proposal
                .proposal_summary
                .clone()
                .take()
                .unwrap()
                .contains(part),
            "Proposal summary does not match"
        );
    }

    assert_eq!(
        proposal
            .creator_address
            .clone()
            .take()
            .unwrap()
            .to_lowercase(),
        expected.creator_address.to_lowercase(),
        "Creator address does not match"
    );
    assert_eq!(
        proposal.yay_votes.clone().take().unwrap(),
        expected.yay_votes,
        "Yay votes do not match"
    );
    assert_eq!(
        proposal.nay_votes.clone().take().unwrap(),
        expected.nay_votes,
        "Nay votes do not match"
    );
    assert_eq!(
        proposal.executed.clone().take().unwrap(),
        expected.executed,
        "Executed flag does not match"
    );

    if let Some(txid) = expected.transaction_hash {
        assert_eq!(
            proposal.transaction_hash.clone().take().unwrap(),
            Some(txid.to_string()),
            "Transaction hash does not match"
        );
    }

    if let Some(deadline_str) = expected.deadline {
        assert_eq!(
            proposal.deadline.clone().take().unwrap(),
            parse_datetime(deadline_str),
            "Deadline does not match"
        );
    }
}
