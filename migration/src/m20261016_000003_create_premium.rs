use sea_orm_migration::prelude::*;

use super::m20261016_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Premium::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Premium::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          // one grant row per user, renewals upsert on this key
          .col(
            ColumnDef::new(Premium::UserId)
              .big_integer()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Premium::StartDate).date_time().not_null())
          .col(ColumnDef::new(Premium::EndDate).date_time().not_null())
          .col(ColumnDef::new(Premium::PromptLimit).integer().not_null())
          .col(
            ColumnDef::new(Premium::PromptsUsed)
              .integer()
              .not_null()
              .default(0),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_premium_user")
              .from(Premium::Table, Premium::UserId)
              .to(Users::Table, Users::TgUserId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Premium::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Premium {
  Table,
  Id,
  UserId,
  StartDate,
  EndDate,
  PromptLimit,
  PromptsUsed,
}
