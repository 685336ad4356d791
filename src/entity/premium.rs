//! Premium grant - a time-windowed, usage-capped entitlement of one user.
//!
//! There is at most one row per user. Issuing a new grant overwrites the
//! window and resets the usage counter.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "premium")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i64,
  pub start_date: DateTime,
  pub end_date: DateTime,
  pub prompt_limit: i32,
  pub prompts_used: i32,
}

impl Model {
  /// Whether one more prompt may be consumed at `now`.
  ///
  /// The usage counter must be strictly below the limit, so a grant with
  /// `prompts_used == prompt_limit` is no longer active.
  pub fn is_active(&self, now: DateTime) -> bool {
    now < self.end_date && self.prompts_used < self.prompt_limit
  }

  pub fn is_expired(&self, now: DateTime) -> bool {
    now >= self.end_date
  }

  pub fn remaining(&self) -> i32 {
    (self.prompt_limit - self.prompts_used).max(0)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::TgUserId"
  )]
  User,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
