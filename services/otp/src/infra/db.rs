use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use happytails_otp_schema::{otp_records, users};

use crate::domain::repository::{OtpRepository, UserRepository};
use crate::domain::types::{OtpRecord, UserAccount};
use crate::error::OtpServiceError;

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, OtpServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        Ok(model.map(user_from_model))
    }
}

fn user_from_model(model: users::Model) -> UserAccount {
    UserAccount {
        id: model.id,
        email: model.email,
        verified: model.verified,
    }
}

// ── OTP repository ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: DatabaseConnection,
}

impl OtpRepository for DbOtpRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<OtpRecord>, OtpServiceError> {
        let model = otp_records::Entity::find_by_id(email.to_owned())
            .one(&self.db)
            .await
            .context("find otp record by email")?;
        Ok(model.map(record_from_model))
    }

    async fn replace(&self, record: &OtpRecord) -> Result<(), OtpServiceError> {
        otp_records::Entity::insert(otp_records::ActiveModel {
            email: Set(record.email.clone()),
            id: Set(record.id),
            user_id: Set(record.user_id),
            code_hash: Set(record.code_hash.clone()),
            created_at: Set(record.created_at),
            expire_at: Set(record.expire_at),
        })
        .on_conflict(
            OnConflict::column(otp_records::Column::Email)
                .update_columns([
                    otp_records::Column::Id,
                    otp_records::Column::UserId,
                    otp_records::Column::CodeHash,
                    otp_records::Column::CreatedAt,
                    otp_records::Column::ExpireAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("upsert otp record")?;
        Ok(())
    }

    async fn delete_issuance(&self, email: &str, id: Uuid) -> Result<bool, OtpServiceError> {
        let result = otp_records::Entity::delete_many()
            .filter(otp_records::Column::Email.eq(email))
            .filter(otp_records::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("delete otp issuance")?;
        Ok(result.rows_affected > 0)
    }

    async fn consume_and_verify(&self, record: &OtpRecord) -> Result<bool, OtpServiceError> {
        let email = record.email.clone();
        let id = record.id;
        let consumed = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    // Conditional on the issuance id: only one caller can win.
                    let deleted = otp_records::Entity::delete_many()
                        .filter(otp_records::Column::Email.eq(email.clone()))
                        .filter(otp_records::Column::Id.eq(id))
                        .exec(txn)
                        .await?;
                    if deleted.rows_affected == 0 {
                        return Ok(false);
                    }
                    users::Entity::update_many()
                        .col_expr(users::Column::Verified, Expr::value(true))
                        .filter(users::Column::Email.eq(email))
                        .exec(txn)
                        .await?;
                    Ok(true)
                })
            })
            .await
            .context("consume otp and verify user")?;
        Ok(consumed)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, OtpServiceError> {
        let result = otp_records::Entity::delete_many()
            .filter(otp_records::Column::ExpireAt.lt(now))
            .exec(&self.db)
            .await
            .context("purge expired otp records")?;
        Ok(result.rows_affected)
    }
}

fn record_from_model(model: otp_records::Model) -> OtpRecord {
    OtpRecord {
        id: model.id,
        user_id: model.user_id,
        email: model.email,
        code_hash: model.code_hash,
        created_at: model.created_at,
        expire_at: model.expire_at,
    }
}
