//! `SeaORM` Entity for loans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{LoanCategory, LoanStatus, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub principal: i64,
    pub outstanding: i64,
    pub total_repayment: i64,
    pub currency: String,
    pub status: LoanStatus,
    pub payment_status: PaymentStatus,
    pub category: LoanCategory,
    pub duration_days: i32,
    pub disbursed_at: Option<DateTimeWithTimeZone>,
    pub repayment_date: Option<DateTimeWithTimeZone>,
    pub last_penalty_date: Option<Date>,
    pub rejection_reason: Option<String>,
    pub trace_id: Uuid,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan_history::Entity")]
    LoanHistory,
}

impl Related<super::loan_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
