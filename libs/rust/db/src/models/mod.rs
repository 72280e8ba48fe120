pub mod dao_member;
pub mod dao_proposal;
pub mod investment;
pub mod sea_orm_active_enums;
