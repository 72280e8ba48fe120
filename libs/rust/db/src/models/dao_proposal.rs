use sea_orm::entity::prelude::*;

/// Relational projection of the contract's per-proposal struct, keyed by the
/// contract-assigned `proposal_id` (1-indexed, monotonically increasing,
/// never reused). `proposal_id` is immutable once stored.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dao_proposals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub proposal_id: i64,
    pub lot_size: i64,
    pub share_price: f64,
    pub max_per_investor: i64,
    pub proposal_summary: String,
    pub creator_address: String,
    pub deadline: DateTime,
    pub yay_votes: i64,
    pub nay_votes: i64,
    pub executed: bool,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
