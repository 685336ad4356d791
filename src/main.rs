//! GPT bot - Telegram front-end for a hosted LLM with premium quotas
//!
//! Architecture:
//! - SeaORM for database access (SQLite or MySQL)
//! - Teloxide for the Telegram bot with inline keyboards
//! - Reqwest for the completion API
//! - Axum for the health endpoint
//! - Tokio for async runtime

mod entity;
mod error;
mod i18n;
mod llm;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use std::{collections::HashSet, env};

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{llm::OpenAi, prelude::*, state::AppState};

fn parse_admins(raw: &str) -> anyhow::Result<HashSet<i64>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|id| {
      id.parse::<i64>().with_context(|| format!("Invalid admin id `{id}`"))
    })
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "gptbot=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let admins = parse_admins(&env::var("ADMIN_IDS").unwrap_or_default())?;
  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:gptbot.db?mode=rwc".into());
  let token = env::var("TELOXIDE_TOKEN")
    .or_else(|_| env::var("TELEGRAM_BOT_TOKEN"))
    .context("TELOXIDE_TOKEN not set")?;
  let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
  let api_base = env::var("OPENAI_API_BASE")
    .unwrap_or_else(|_| "https://api.openai.com/v1".into());
  let config = state::Config::from_env()?;

  info!("Starting GPT bot v{}", env!("CARGO_PKG_VERSION"));
  if admins.is_empty() {
    warn!("No admins configured, admin commands disabled");
  }

  let llm = Arc::new(OpenAi::new(api_base, api_key));
  let app =
    Arc::new(AppState::new(&db_url, &token, admins, llm, config).await?);

  plugins::App::new()
    .register(plugins::telegram::Plugin)
    .register(plugins::server::Plugin)
    .run(app)
    .await;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admins_list() {
    assert_eq!(parse_admins("").unwrap(), HashSet::new());
    assert_eq!(parse_admins(" 1, 2 ,,3").unwrap(), HashSet::from([1, 2, 3]));
    assert!(parse_admins("1,abc").is_err());
  }
}
