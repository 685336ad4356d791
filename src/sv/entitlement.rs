//! Quota rule on top of the premium store.
//!
//! Nothing is cached: every check reads the current grant row, so expiry and
//! exhaustion take effect on the very next check.
//!
//! `is_entitled` and `consume_one` are separate round trips without a lock.
//! Two concurrent requests of the same user at the limit boundary can both
//! pass the check, overshooting the limit by one. Quota is best-effort.

use crate::{entity::premium, prelude::*, sv};

/// Computed state of a user's grant. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum GrantStatus {
  None,
  Active { remaining: i32, end_date: DateTime },
  Expired,
  Exhausted,
}

impl GrantStatus {
  /// Expiry dominates exhaustion.
  pub fn of(grant: Option<&premium::Model>, now: DateTime) -> Self {
    match grant {
      None => GrantStatus::None,
      Some(g) if g.is_expired(now) => GrantStatus::Expired,
      Some(g) if !g.is_active(now) => GrantStatus::Exhausted,
      Some(g) => {
        GrantStatus::Active { remaining: g.remaining(), end_date: g.end_date }
      }
    }
  }

  pub fn is_active(&self) -> bool {
    matches!(self, GrantStatus::Active { .. })
  }
}

pub struct Entitlement<'a> {
  premium: sv::Premium<'a>,
}

impl<'a> Entitlement<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { premium: sv::Premium::new(db) }
  }

  pub async fn is_entitled(&self, user_id: i64) -> Result<bool> {
    Ok(self.status(user_id).await?.is_active())
  }

  pub async fn status(&self, user_id: i64) -> Result<GrantStatus> {
    let grant = self.premium.by_user(user_id).await?;
    Ok(GrantStatus::of(grant.as_ref(), Utc::now().naive_utc()))
  }

  /// Counts one used prompt. The caller checks `is_entitled` beforehand.
  pub async fn consume_one(&self, user_id: i64) -> Result<()> {
    self.premium.increment_usage(user_id).await?;
    Ok(())
  }

  pub async fn grant(
    &self,
    user_id: i64,
    days: u32,
    prompt_limit: i32,
  ) -> Result<premium::Model> {
    self.premium.grant(user_id, days, prompt_limit).await
  }
}
