use crate::{entity::prompt, prelude::*};

pub struct Prompt<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Prompt<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn append(
    &self,
    user_id: i64,
    prompt_text: impl Into<String>,
    response_text: impl Into<String>,
  ) -> Result<prompt::Model> {
    let now = Utc::now().naive_utc();
    let record = prompt::ActiveModel {
      user_id: Set(user_id),
      prompt_text: Set(prompt_text.into()),
      response_text: Set(response_text.into()),
      created_at: Set(now),
      ..Default::default()
    };

    Ok(record.insert(self.db).await?)
  }

  /// Latest `limit` records of the user, newest first.
  pub async fn by_user(
    &self,
    user_id: i64,
    limit: u64,
  ) -> Result<Vec<prompt::Model>> {
    let records = prompt::Entity::find()
      .filter(prompt::Column::UserId.eq(user_id))
      .order_by_desc(prompt::Column::Id)
      .limit(limit)
      .all(self.db)
      .await?;
    Ok(records)
  }

  pub async fn count_by_user(&self, user_id: i64) -> Result<u64> {
    let count = prompt::Entity::find()
      .filter(prompt::Column::UserId.eq(user_id))
      .count(self.db)
      .await?;
    Ok(count)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(prompt::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::{self, testing::setup_test_db};

  #[tokio::test]
  async fn test_append_and_history() {
    let db = setup_test_db().await;
    sv::User::new(&db).upsert(1, None).await.unwrap();
    sv::User::new(&db).upsert(2, None).await.unwrap();
    let sv = Prompt::new(&db);

    sv.append(1, "first", "one").await.unwrap();
    sv.append(1, "second", "two").await.unwrap();
    sv.append(2, "other", "three").await.unwrap();

    let history = sv.by_user(1, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].prompt_text, "second");
    assert_eq!(history[1].response_text, "one");

    assert_eq!(sv.by_user(1, 1).await.unwrap().len(), 1);
    assert_eq!(sv.count_by_user(1).await.unwrap(), 2);
    assert_eq!(sv.count().await.unwrap(), 3);
  }
}
