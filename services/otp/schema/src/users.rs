use sea_orm::entity::prelude::*;

/// User account owned by the auth subsystem. This service only reads it and
/// flips `verified`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub verified: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::otp_records::Entity")]
    OtpRecords,
}

impl Related<super::otp_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OtpRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
