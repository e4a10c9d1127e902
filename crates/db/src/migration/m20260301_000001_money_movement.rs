//! Money-movement schema.
//!
//! Creates the ledger, idempotency, loan, and wallet tables. Written with the
//! schema builder so the same migration runs on PostgreSQL and SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ---------------------------------------------------------------
        // ledger_entries: append-only, only status/processed_at change
        // ---------------------------------------------------------------
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LedgerEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(LedgerEntries::TraceId).uuid().not_null())
                    .col(ColumnDef::new(LedgerEntries::ActorId).uuid().null())
                    .col(ColumnDef::new(LedgerEntries::Account).string_len(128).not_null())
                    .col(ColumnDef::new(LedgerEntries::EntryType).string_len(8).not_null())
                    .col(ColumnDef::new(LedgerEntries::Category).string_len(16).not_null())
                    .col(ColumnDef::new(LedgerEntries::Subtype).string_len(64).not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(LedgerEntries::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(LedgerEntries::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(LedgerEntries::Status).string_len(16).not_null())
                    .col(ColumnDef::new(LedgerEntries::IdempotencyKey).string_len(255).null())
                    .col(ColumnDef::new(LedgerEntries::Meta).json().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_trace")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::TraceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_account_category")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::Account)
                    .col(LedgerEntries::Category)
                    .col(LedgerEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_idempotency_key")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::IdempotencyKey)
                    .to_owned(),
            )
            .await?;

        // ---------------------------------------------------------------
        // idempotency_keys: one cached response per (key, actor)
        // ---------------------------------------------------------------
        manager
            .create_table(
                Table::create()
                    .table(IdempotencyKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IdempotencyKeys::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(IdempotencyKeys::IdempotencyKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IdempotencyKeys::ActorId).uuid().not_null())
                    .col(ColumnDef::new(IdempotencyKeys::CachedResponse).text().not_null())
                    .col(
                        ColumnDef::new(IdempotencyKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyKeys::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_idempotency_keys_key_actor")
                    .table(IdempotencyKeys::Table)
                    .col(IdempotencyKeys::IdempotencyKey)
                    .col(IdempotencyKeys::ActorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_idempotency_keys_expires")
                    .table(IdempotencyKeys::Table)
                    .col(IdempotencyKeys::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // ---------------------------------------------------------------
        // wallets: one per user, optimistic version
        // ---------------------------------------------------------------
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wallets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Wallets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Wallets::AccountRef).string_len(64).not_null())
                    .col(ColumnDef::new(Wallets::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::Balance).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Wallets::Held)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::Held).gte(0)),
                    )
                    .col(ColumnDef::new(Wallets::Version).big_integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Wallets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_wallets_user")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ---------------------------------------------------------------
        // loans and their append-only history
        // ---------------------------------------------------------------
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Loans::UserId).uuid().not_null())
                    .col(ColumnDef::new(Loans::Principal).big_integer().not_null())
                    .col(
                        ColumnDef::new(Loans::Outstanding)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Loans::Outstanding).gte(0)),
                    )
                    .col(ColumnDef::new(Loans::TotalRepayment).big_integer().not_null())
                    .col(ColumnDef::new(Loans::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Loans::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Loans::PaymentStatus).string_len(16).not_null())
                    .col(ColumnDef::new(Loans::Category).string_len(16).not_null())
                    .col(ColumnDef::new(Loans::DurationDays).integer().not_null())
                    .col(ColumnDef::new(Loans::DisbursedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Loans::RepaymentDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Loans::LastPenaltyDate).date().null())
                    .col(ColumnDef::new(Loans::RejectionReason).text().null())
                    .col(ColumnDef::new(Loans::TraceId).uuid().not_null())
                    .col(ColumnDef::new(Loans::Version).big_integer().not_null().default(1))
                    .col(ColumnDef::new(Loans::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Loans::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_loans_status_repayment_date")
                    .table(Loans::Table)
                    .col(Loans::Status)
                    .col(Loans::RepaymentDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_loans_user")
                    .table(Loans::Table)
                    .col(Loans::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoanHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LoanHistory::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(LoanHistory::LoanId).uuid().not_null())
                    .col(ColumnDef::new(LoanHistory::Sequence).integer().not_null())
                    .col(ColumnDef::new(LoanHistory::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(LoanHistory::ResultingOutstanding)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoanHistory::Action).string_len(16).not_null())
                    .col(ColumnDef::new(LoanHistory::TraceId).uuid().not_null())
                    .col(
                        ColumnDef::new(LoanHistory::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_history_loan")
                            .from(LoanHistory::Table, LoanHistory::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_loan_history_loan_sequence")
                    .table(LoanHistory::Table)
                    .col(LoanHistory::LoanId)
                    .col(LoanHistory::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoanHistory::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IdempotencyKeys::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum LedgerEntries {
    Table,
    Id,
    TraceId,
    ActorId,
    Account,
    EntryType,
    Category,
    Subtype,
    Amount,
    Currency,
    Status,
    IdempotencyKey,
    Meta,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum IdempotencyKeys {
    Table,
    Id,
    IdempotencyKey,
    ActorId,
    CachedResponse,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    AccountRef,
    Currency,
    Balance,
    Held,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Loans {
    Table,
    Id,
    UserId,
    Principal,
    Outstanding,
    TotalRepayment,
    Currency,
    Status,
    PaymentStatus,
    Category,
    DurationDays,
    DisbursedAt,
    RepaymentDate,
    LastPenaltyDate,
    RejectionReason,
    TraceId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LoanHistory {
    Table,
    Id,
    LoanId,
    Sequence,
    Amount,
    ResultingOutstanding,
    Action,
    TraceId,
    RecordedAt,
}
