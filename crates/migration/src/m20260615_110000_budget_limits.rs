use sea_orm_migration::prelude::*;

use crate::m20260601_120000_families::Families;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum BudgetLimits {
    Table,
    FamilyId,
    Category,
    PeriodStart,
    PeriodEnd,
    AmountMinor,
    SetBy,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BudgetLimits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BudgetLimits::FamilyId).string().not_null())
                    .col(ColumnDef::new(BudgetLimits::Category).string().not_null())
                    .col(
                        ColumnDef::new(BudgetLimits::PeriodStart)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetLimits::PeriodEnd)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetLimits::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetLimits::SetBy).string().not_null())
                    .col(ColumnDef::new(BudgetLimits::UpdatedAt).timestamp().not_null())
                    .primary_key(
                        Index::create()
                            .col(BudgetLimits::FamilyId)
                            .col(BudgetLimits::Category)
                            .col(BudgetLimits::PeriodStart)
                            .col(BudgetLimits::PeriodEnd),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_limits-family_id")
                            .from(BudgetLimits::Table, BudgetLimits::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BudgetLimits::Table).to_owned())
            .await?;
        Ok(())
    }
}
