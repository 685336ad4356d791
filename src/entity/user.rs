use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Interface language of a user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Language {
  #[sea_orm(string_value = "en")]
  #[default]
  En,
  #[sea_orm(string_value = "ru")]
  Ru,
}

impl Language {
  pub fn code(self) -> &'static str {
    match self {
      Language::En => "en",
      Language::Ru => "ru",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "en" => Some(Language::En),
      "ru" => Some(Language::Ru),
      _ => None,
    }
  }

  /// Name of the language in itself, used on the selection keyboard.
  pub fn native_name(self) -> &'static str {
    match self {
      Language::En => "English",
      Language::Ru => "Русский",
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  /// Telegram id
  #[sea_orm(primary_key, auto_increment = false)]
  pub tg_user_id: i64,
  pub username: Option<String>,
  pub language: Language,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_one = "super::premium::Entity")]
  Premium,
  #[sea_orm(has_many = "super::prompt::Entity")]
  Prompts,
}

impl Related<super::premium::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Premium.def()
  }
}

impl Related<super::prompt::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Prompts.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
