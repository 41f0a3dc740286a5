use sea_orm_migration::prelude::*;

use crate::m20260601_120000_families::Families;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    FamilyId,
    CreatedBy,
    AmountMinor,
    Category,
    OccurredAt,
    Seq,
    Note,
    IdempotencyKey,
    DeletedAt,
    DeletedBy,
    ReplacesTransactionId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::FamilyId).string().not_null())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Seq).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(ColumnDef::new(Transactions::IdempotencyKey).string())
                    .col(ColumnDef::new(Transactions::DeletedAt).timestamp())
                    .col(ColumnDef::new(Transactions::DeletedBy).string())
                    .col(ColumnDef::new(Transactions::ReplacesTransactionId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-family_id")
                            .from(Transactions::Table, Transactions::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-family_id-occurred_at-seq")
                    .table(Transactions::Table)
                    .col(Transactions::FamilyId)
                    .col(Transactions::OccurredAt)
                    .col(Transactions::Seq)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-transactions-family_id-seq")
                    .table(Transactions::Table)
                    .col(Transactions::FamilyId)
                    .col(Transactions::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Retry dedup for appends.
        manager
            .create_index(
                Index::create()
                    .name("uidx-transactions-family_id-created_by-idempotency_key")
                    .table(Transactions::Table)
                    .col(Transactions::FamilyId)
                    .col(Transactions::CreatedBy)
                    .col(Transactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        Ok(())
    }
}
