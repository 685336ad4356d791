use sea_orm::sea_query::OnConflict;

use crate::{
  entity::{Language, user},
  prelude::*,
};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Registers the user or refreshes the display name of a known one.
  pub async fn upsert(
    &self,
    tg_user_id: i64,
    username: Option<String>,
  ) -> Result<()> {
    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
      tg_user_id: Set(tg_user_id),
      username: Set(username),
      language: Set(Language::default()),
      created_at: Set(now),
    };

    user::Entity::insert(user)
      .on_conflict(
        OnConflict::column(user::Column::TgUserId)
          .update_column(user::Column::Username)
          .to_owned(),
      )
      .exec_without_returning(self.db)
      .await?;

    Ok(())
  }

  pub async fn get_or_create(&self, tg_user_id: i64) -> Result<user::Model> {
    if let Some(user) =
      user::Entity::find_by_id(tg_user_id).one(self.db).await?
    {
      return Ok(user);
    }

    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
      tg_user_id: Set(tg_user_id),
      username: Set(None),
      language: Set(Language::default()),
      created_at: Set(now),
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_id(&self, tg_user_id: i64) -> Result<Option<user::Model>> {
    let user = user::Entity::find_by_id(tg_user_id).one(self.db).await?;
    Ok(user)
  }

  /// Language of the user, `en` for unknown ones.
  pub async fn language(&self, tg_user_id: i64) -> Result<Language> {
    Ok(self.by_id(tg_user_id).await?.map(|u| u.language).unwrap_or_default())
  }

  /// Returns `false` without touching anything if the user is unknown.
  pub async fn set_language(
    &self,
    tg_user_id: i64,
    language: Language,
  ) -> Result<bool> {
    let res = user::Entity::update_many()
      .set(user::ActiveModel { language: Set(language), ..Default::default() })
      .filter(user::Column::TgUserId.eq(tg_user_id))
      .exec(self.db)
      .await?;

    if res.rows_affected == 0 {
      warn!("Language change for unknown user {tg_user_id} ignored");
    }
    Ok(res.rows_affected > 0)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(user::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::setup_test_db;

  #[tokio::test]
  async fn test_upsert_is_idempotent() {
    let db = setup_test_db().await;
    let sv = User::new(&db);

    sv.upsert(42, Some("alice".into())).await.unwrap();
    sv.upsert(42, Some("alice".into())).await.unwrap();

    let user = sv.by_id(42).await.unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(user.language, Language::En);
    assert_eq!(sv.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_upsert_updates_name_keeps_language() {
    let db = setup_test_db().await;
    let sv = User::new(&db);

    sv.upsert(42, Some("alice".into())).await.unwrap();
    assert!(sv.set_language(42, Language::Ru).await.unwrap());
    sv.upsert(42, Some("alice_new".into())).await.unwrap();

    let user = sv.by_id(42).await.unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("alice_new"));
    assert_eq!(user.language, Language::Ru);
  }

  #[tokio::test]
  async fn test_set_language_unknown_user() {
    let db = setup_test_db().await;
    let sv = User::new(&db);

    assert!(!sv.set_language(7, Language::Ru).await.unwrap());
    assert!(sv.by_id(7).await.unwrap().is_none());
    assert_eq!(sv.language(7).await.unwrap(), Language::En);
  }

  #[tokio::test]
  async fn test_get_or_create() {
    let db = setup_test_db().await;
    let sv = User::new(&db);

    let created = sv.get_or_create(5).await.unwrap();
    assert_eq!(created.username, None);

    sv.set_language(5, Language::Ru).await.unwrap();
    let existing = sv.get_or_create(5).await.unwrap();
    assert_eq!(existing.language, Language::Ru);
    assert_eq!(existing.created_at, created.created_at);
  }
}
