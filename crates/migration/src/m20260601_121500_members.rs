use sea_orm_migration::prelude::*;

use crate::m20260601_120000_families::Families;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Members {
    Table,
    FamilyId,
    UserId,
    Role,
    State,
    InvitedBy,
    InvitedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::FamilyId).string().not_null())
                    .col(ColumnDef::new(Members::UserId).string().not_null())
                    .col(ColumnDef::new(Members::Role).string().not_null())
                    .col(ColumnDef::new(Members::State).string().not_null())
                    .col(ColumnDef::new(Members::InvitedBy).string())
                    .col(ColumnDef::new(Members::InvitedAt).timestamp().not_null())
                    .col(ColumnDef::new(Members::UpdatedAt).timestamp().not_null())
                    .primary_key(Index::create().col(Members::FamilyId).col(Members::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-family_id")
                            .from(Members::Table, Members::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups by user (single-family policy checks) scan this index.
        manager
            .create_index(
                Index::create()
                    .name("idx-members-user_id-state")
                    .table(Members::Table)
                    .col(Members::UserId)
                    .col(Members::State)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        Ok(())
    }
}
