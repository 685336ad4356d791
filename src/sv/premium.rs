use sea_orm::sea_query::{Expr, OnConflict};

use crate::{entity::premium, prelude::*, sv};

/// Longest grant that can be issued, roughly ten years.
pub const MAX_GRANT_DAYS: u32 = 3650;

pub struct Premium<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Premium<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Issues a grant of `days` days and `prompt_limit` prompts starting now.
  ///
  /// An existing grant is overwritten, not extended: the old window is
  /// discarded even if it ends later, and the usage counter goes back to 0.
  pub async fn grant(
    &self,
    user_id: i64,
    days: u32,
    prompt_limit: i32,
  ) -> Result<premium::Model> {
    let start = Utc::now().naive_utc();
    let end = grant_end(start, days)?;

    sv::User::new(self.db).get_or_create(user_id).await?;

    let grant = premium::ActiveModel {
      user_id: Set(user_id),
      start_date: Set(start),
      end_date: Set(end),
      prompt_limit: Set(prompt_limit),
      prompts_used: Set(0),
      ..Default::default()
    };

    premium::Entity::insert(grant)
      .on_conflict(
        OnConflict::column(premium::Column::UserId)
          .update_columns([
            premium::Column::StartDate,
            premium::Column::EndDate,
            premium::Column::PromptLimit,
            premium::Column::PromptsUsed,
          ])
          .to_owned(),
      )
      .exec_without_returning(self.db)
      .await?;

    info!("Premium granted to {user_id}: {days} days, {prompt_limit} prompts");

    self.by_user(user_id).await?.ok_or(Error::UserNotFound)
  }

  pub async fn by_user(&self, user_id: i64) -> Result<Option<premium::Model>> {
    let grant = premium::Entity::find()
      .filter(premium::Column::UserId.eq(user_id))
      .one(self.db)
      .await?;
    Ok(grant)
  }

  /// Bumps the usage counter of the user's grant in a single statement.
  ///
  /// Does nothing when the user has no grant; returns whether a row changed.
  pub async fn increment_usage(&self, user_id: i64) -> Result<bool> {
    let res = premium::Entity::update_many()
      .col_expr(
        premium::Column::PromptsUsed,
        Expr::col(premium::Column::PromptsUsed).add(1),
      )
      .filter(premium::Column::UserId.eq(user_id))
      .exec(self.db)
      .await?;

    if res.rows_affected == 0 {
      debug!("No premium row for {user_id}, usage not counted");
    }
    Ok(res.rows_affected > 0)
  }

  pub async fn count_active(&self) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let count = premium::Entity::find()
      .filter(premium::Column::EndDate.gt(now))
      .filter(
        Expr::col(premium::Column::PromptsUsed)
          .lt(Expr::col(premium::Column::PromptLimit)),
      )
      .count(self.db)
      .await?;
    Ok(count)
  }
}

/// End of a grant of `days` days starting at `start`.
fn grant_end(start: DateTime, days: u32) -> Result<DateTime> {
  let invalid = || {
    let msg = format!("Grant period must be 0..={MAX_GRANT_DAYS} days");
    Error::InvalidArgs(msg)
  };

  if days > MAX_GRANT_DAYS {
    return Err(invalid());
  }
  TimeDelta::try_days(days.into())
    .and_then(|period| start.checked_add_signed(period))
    .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::setup_test_db;

  #[tokio::test]
  async fn test_grant_creates_user_and_row() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    let grant = sv.grant(12345, 30, 100).await.unwrap();

    assert_eq!(grant.user_id, 12345);
    assert_eq!(grant.prompt_limit, 100);
    assert_eq!(grant.prompts_used, 0);
    assert_eq!((grant.end_date - grant.start_date).num_days(), 30);
    assert!(sv::User::new(&db).by_id(12345).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_grant_period_out_of_range() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    for days in [MAX_GRANT_DAYS + 1, 4_000_000_000, u32::MAX] {
      assert!(matches!(
        sv.grant(1, days, 10).await,
        Err(Error::InvalidArgs(_))
      ));
    }

    assert!(sv.by_user(1).await.unwrap().is_none());
    assert!(sv::User::new(&db).by_id(1).await.unwrap().is_none());

    let grant = sv.grant(1, MAX_GRANT_DAYS, 10).await.unwrap();
    assert_eq!(
      (grant.end_date - grant.start_date).num_days(),
      i64::from(MAX_GRANT_DAYS)
    );
  }

  #[test]
  fn grant_end_near_max_date() {
    assert!(grant_end(DateTime::MAX, 1).is_err());
    assert!(grant_end(DateTime::MAX, 0).is_ok());
  }

  #[tokio::test]
  async fn test_regrant_overwrites_window_and_usage() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    let first = sv.grant(1, 365, 100).await.unwrap();
    sv.increment_usage(1).await.unwrap();
    sv.increment_usage(1).await.unwrap();

    let second = sv.grant(1, 1, 10).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.prompts_used, 0);
    assert_eq!(second.prompt_limit, 10);
    assert!(second.end_date < first.end_date);
    assert_eq!(premium::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_increment_usage() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    sv.grant(1, 30, 100).await.unwrap();
    for _ in 0..3 {
      assert!(sv.increment_usage(1).await.unwrap());
    }

    assert_eq!(sv.by_user(1).await.unwrap().unwrap().prompts_used, 3);
  }

  #[tokio::test]
  async fn test_increment_without_grant_is_noop() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    assert!(!sv.increment_usage(99).await.unwrap());
    assert!(sv.by_user(99).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_count_active() {
    let db = setup_test_db().await;
    let sv = Premium::new(&db);

    sv.grant(1, 30, 100).await.unwrap();
    sv.grant(2, 30, 1).await.unwrap();
    sv.increment_usage(2).await.unwrap();
    sv.grant(3, 0, 100).await.unwrap();

    assert_eq!(sv.count_active().await.unwrap(), 1);
  }
}
