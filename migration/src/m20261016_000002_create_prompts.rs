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
          .table(Prompts::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Prompts::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Prompts::UserId).big_integer().not_null())
          .col(ColumnDef::new(Prompts::PromptText).text().not_null())
          .col(ColumnDef::new(Prompts::ResponseText).text().not_null())
          .col(ColumnDef::new(Prompts::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_prompts_user")
              .from(Prompts::Table, Prompts::UserId)
              .to(Users::Table, Users::TgUserId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_prompts_user")
          .table(Prompts::Table)
          .col(Prompts::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Prompts::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Prompts {
  Table,
  Id,
  UserId,
  PromptText,
  ResponseText,
  CreatedAt,
}
