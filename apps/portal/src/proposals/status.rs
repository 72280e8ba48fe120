use chrono::NaiveDateTime;
use std::fmt;

/// Lifecycle stage derived at read time from the deadline, the current time
/// and the executed flag. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Voting,
    Closed,
    Marketplace,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Voting => "voting",
            ProposalStatus::Closed => "closed",
            ProposalStatus::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executed proposal is always tradable, even before its nominal
/// deadline; otherwise the deadline decides.
pub fn derive_status(deadline: NaiveDateTime, executed: bool, now: NaiveDateTime) -> ProposalStatus {
    if executed {
        ProposalStatus::Marketplace
    } else if deadline > now {
        ProposalStatus::Voting
    } else {
        ProposalStatus::Closed
    }
}
