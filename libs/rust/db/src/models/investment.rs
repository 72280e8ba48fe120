use super::sea_orm_active_enums::InvestmentStatus;
use sea_orm::entity::prelude::*;

/// A confirmed lot purchase. Immutable after creation except `status`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub investor_address: String,
    pub proposal_id: i64,
    pub lots: i64,
    pub lot_price: f64,
    pub total_amount: f64,
    pub transaction_hash: String,
    pub status: InvestmentStatus,
    pub purchase_date: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
