use std::{
  collections::HashSet,
  env,
  path::{Path, PathBuf},
  str::FromStr,
};

use teloxide::Bot;
use tokio::{
  fs,
  io::{self, AsyncRead, AsyncWriteExt},
};

use crate::{
  llm::{ChatModel, Completion},
  prelude::*,
  sv::{self, premium::MAX_GRANT_DAYS},
};

#[derive(Debug, Clone)]
pub struct Config {
  /// Length of a premium grant issued from the `/premium` offer
  pub premium_days: u32,
  pub premium_prompt_limit: i32,
  /// Where uploaded documents are stored
  pub files_dir: PathBuf,
  pub default_model: ChatModel,
  pub port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      premium_days: 30,
      premium_prompt_limit: 100,
      files_dir: PathBuf::from("user_files"),
      default_model: ChatModel::default(),
      port: 3000,
    }
  }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match env::var(name) {
    Ok(value) if !value.trim().is_empty() => value
      .trim()
      .parse()
      .with_context(|| format!("Invalid value of {name}: `{value}`")),
    _ => Ok(default),
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();

    let default_model = match env::var("DEFAULT_MODEL") {
      Ok(key) => ChatModel::from_key(key.trim())
        .with_context(|| format!("Unknown DEFAULT_MODEL `{key}`"))?,
      Err(_) => default.default_model,
    };

    Self {
      premium_days: env_or("PREMIUM_DAYS", default.premium_days)?,
      premium_prompt_limit: env_or(
        "PREMIUM_PROMPT_LIMIT",
        default.premium_prompt_limit,
      )?,
      files_dir: env_or("FILES_DIR", default.files_dir)?,
      default_model,
      port: env_or("PORT", default.port)?,
    }
    .validate()
  }

  pub fn validate(self) -> anyhow::Result<Self> {
    if self.premium_days > MAX_GRANT_DAYS {
      anyhow::bail!("PREMIUM_DAYS must be at most {MAX_GRANT_DAYS}");
    }
    if self.premium_prompt_limit <= 0 {
      anyhow::bail!("PREMIUM_PROMPT_LIMIT must be positive");
    }
    Ok(self)
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub premium: sv::Premium<'a>,
  pub prompt: sv::Prompt<'a>,
  pub entitlement: sv::Entitlement<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub bot: Bot,
  pub admins: HashSet<i64>,
  pub config: Config,
  pub llm: Arc<dyn Completion>,
  /// Model picked with `/model`, kept in memory only
  models: DashMap<i64, ChatModel>,
}

impl AppState {
  pub async fn new(
    db_url: &str,
    bot_token: &str,
    admins: HashSet<i64>,
    llm: Arc<dyn Completion>,
    config: Config,
  ) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(db_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    Ok(Self::from_parts(db, Bot::new(bot_token), admins, llm, config))
  }

  pub fn from_parts(
    db: DatabaseConnection,
    bot: Bot,
    admins: HashSet<i64>,
    llm: Arc<dyn Completion>,
    config: Config,
  ) -> Self {
    Self { db, bot, admins, config, llm, models: DashMap::new() }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      premium: sv::Premium::new(&self.db),
      prompt: sv::Prompt::new(&self.db),
      entitlement: sv::Entitlement::new(&self.db),
    }
  }

  pub fn is_admin(&self, user_id: i64) -> bool {
    self.admins.contains(&user_id)
  }

  pub fn model_of(&self, user_id: i64) -> ChatModel {
    self
      .models
      .get(&user_id)
      .map(|model| *model)
      .unwrap_or(self.config.default_model)
  }

  pub fn select_model(&self, user_id: i64, model: ChatModel) {
    self.models.insert(user_id, model);
  }

  pub async fn ensure_entitled(&self, user_id: i64) -> Result<()> {
    if self.sv().entitlement.is_entitled(user_id).await? {
      Ok(())
    } else {
      Err(Error::NotEntitled)
    }
  }

  /// Runs one gated prompt: check, complete, record, count.
  /// A blank reply counts as a failed completion.
  ///
  /// Nothing is rolled back if recording or counting fails after a
  /// successful completion.
  pub async fn ask(&self, user_id: i64, prompt: &str) -> Result<String> {
    self.ensure_entitled(user_id).await?;

    let model = self.model_of(user_id);
    let reply =
      self.llm.complete(model, prompt).await.map_err(Error::Completion)?;
    if reply.trim().is_empty() {
      return Err(Error::Completion(anyhow::anyhow!("Empty completion")));
    }

    let sv = self.sv();
    sv.prompt.append(user_id, prompt, reply.as_str()).await?;
    sv.entitlement.consume_one(user_id).await?;

    Ok(reply)
  }

  pub fn attachment_path(&self, file_id: &str) -> PathBuf {
    attachment_path(&self.config.files_dir, file_id)
  }

  /// Stores an uploaded document under the premium gate.
  ///
  /// Usage is not counted. A failed write leaves no file behind.
  pub async fn store_attachment<R>(
    &self,
    user_id: i64,
    file_id: &str,
    mut content: R,
  ) -> Result<PathBuf>
  where
    R: AsyncRead + Unpin,
  {
    self.ensure_entitled(user_id).await?;

    fs::create_dir_all(&self.config.files_dir).await?;
    let path = self.attachment_path(file_id);

    let written = async {
      let mut dst = fs::File::create(&path).await?;
      io::copy(&mut content, &mut dst).await?;
      dst.flush().await
    }
    .await;

    if let Err(err) = written {
      if let Err(rm_err) = fs::remove_file(&path).await {
        warn!("Failed to remove partial {}: {rm_err}", path.display());
      }
      return Err(err.into());
    }

    info!("Saved document of {user_id} to {}", path.display());
    Ok(path)
  }
}

/// File ids come from Telegram, anything but `[A-Za-z0-9_-]` is replaced.
pub fn attachment_path(dir: &Path, file_id: &str) -> PathBuf {
  let name: String = file_id
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }
    })
    .collect();
  dir.join(format!("{name}.txt"))
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::sv::testing::setup_test_db;

  #[derive(Default)]
  struct Echo {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl Completion for Echo {
    async fn complete(
      &self,
      model: ChatModel,
      prompt: &str,
    ) -> anyhow::Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(format!("{}: {prompt}", model.key()))
    }
  }

  struct Broken;

  #[async_trait]
  impl Completion for Broken {
    async fn complete(&self, _: ChatModel, _: &str) -> anyhow::Result<String> {
      anyhow::bail!("service unavailable")
    }
  }

  struct Blank;

  #[async_trait]
  impl Completion for Blank {
    async fn complete(&self, _: ChatModel, _: &str) -> anyhow::Result<String> {
      Ok(" \n".into())
    }
  }

  async fn app_with(llm: Arc<dyn Completion>) -> AppState {
    app_with_config(llm, Config::default()).await
  }

  async fn app_with_config(
    llm: Arc<dyn Completion>,
    config: Config,
  ) -> AppState {
    let db = setup_test_db().await;
    let admins = HashSet::from([1]);
    AppState::from_parts(db, Bot::new("0:test"), admins, llm, config)
  }

  async fn app_with_files(dir: &Path) -> AppState {
    let config = Config { files_dir: dir.join("files"), ..Default::default() };
    app_with_config(Arc::new(Echo::default()), config).await
  }

  #[tokio::test]
  async fn test_ask_requires_premium() {
    let echo = Arc::new(Echo::default());
    let app = app_with(echo.clone()).await;
    app.sv().user.upsert(10, None).await.unwrap();

    assert!(matches!(app.ask(10, "hi").await, Err(Error::NotEntitled)));
    assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.sv().prompt.count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_ask_records_and_consumes() {
    let app = app_with(Arc::new(Echo::default())).await;
    app.sv().entitlement.grant(10, 30, 2).await.unwrap();

    app.select_model(10, ChatModel::Gpt4);
    let reply = app.ask(10, "hi").await.unwrap();
    assert_eq!(reply, "gpt-4: hi");

    let sv = app.sv();
    let history = sv.prompt.by_user(10, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response_text, "gpt-4: hi");
    assert_eq!(sv.premium.by_user(10).await.unwrap().unwrap().prompts_used, 1);

    app.ask(10, "again").await.unwrap();
    assert!(matches!(app.ask(10, "more").await, Err(Error::NotEntitled)));
  }

  #[tokio::test]
  async fn test_failed_completion_consumes_nothing() {
    let app = app_with(Arc::new(Broken)).await;
    app.sv().entitlement.grant(10, 30, 5).await.unwrap();

    let err = app.ask(10, "hi").await.unwrap_err();
    assert!(err.is_external());

    let sv = app.sv();
    assert_eq!(sv.prompt.count().await.unwrap(), 0);
    assert_eq!(sv.premium.by_user(10).await.unwrap().unwrap().prompts_used, 0);
  }

  #[tokio::test]
  async fn test_blank_completion_consumes_nothing() {
    let app = app_with(Arc::new(Blank)).await;
    app.sv().entitlement.grant(10, 30, 5).await.unwrap();

    assert!(matches!(app.ask(10, "hi").await, Err(Error::Completion(_))));

    let sv = app.sv();
    assert_eq!(sv.prompt.count().await.unwrap(), 0);
    assert_eq!(sv.premium.by_user(10).await.unwrap().unwrap().prompts_used, 0);
  }

  #[tokio::test]
  async fn test_attachment_requires_premium() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with_files(tmp.path()).await;
    app.sv().user.upsert(10, None).await.unwrap();

    let result = app.store_attachment(10, "doc1", &b"notes"[..]).await;
    assert!(matches!(result, Err(Error::NotEntitled)));
    assert!(!app.attachment_path("doc1").exists());
  }

  #[tokio::test]
  async fn test_attachment_stored_without_usage() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with_files(tmp.path()).await;
    app.sv().entitlement.grant(10, 30, 5).await.unwrap();

    let path = app.store_attachment(10, "doc1", &b"notes"[..]).await.unwrap();
    assert_eq!(path, tmp.path().join("files").join("doc1.txt"));
    assert_eq!(fs::read(&path).await.unwrap(), b"notes");

    let grant = app.sv().premium.by_user(10).await.unwrap().unwrap();
    assert_eq!(grant.prompts_used, 0);
  }

  #[tokio::test]
  async fn test_interrupted_attachment_is_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with_files(tmp.path()).await;
    app.sv().entitlement.grant(10, 30, 5).await.unwrap();

    let content = tokio_test::io::Builder::new()
      .read(b"partial")
      .read_error(io::Error::other("connection reset"))
      .build();

    let result = app.store_attachment(10, "doc1", content).await;
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(!app.attachment_path("doc1").exists());
  }

  #[test]
  fn config_limits() {
    assert!(Config::default().validate().is_ok());

    let config = Config { premium_days: MAX_GRANT_DAYS, ..Default::default() };
    assert!(config.validate().is_ok());

    let config =
      Config { premium_days: MAX_GRANT_DAYS + 1, ..Default::default() };
    assert!(config.validate().is_err());

    let config = Config { premium_prompt_limit: 0, ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[tokio::test]
  async fn test_model_selection_defaults() {
    let app = app_with(Arc::new(Echo::default())).await;

    assert_eq!(app.model_of(5), ChatModel::Gpt35Turbo);
    app.select_model(5, ChatModel::Gpt4);
    assert_eq!(app.model_of(5), ChatModel::Gpt4);
    assert_eq!(app.model_of(6), ChatModel::Gpt35Turbo);
    assert!(app.is_admin(1));
    assert!(!app.is_admin(5));
  }

  #[test]
  fn attachment_path_is_sanitized() {
    let dir = Path::new("files");
    assert_eq!(
      attachment_path(dir, "BQACAgIAAxk-_9"),
      dir.join("BQACAgIAAxk-_9.txt")
    );
    assert_eq!(
      attachment_path(dir, "../etc/passwd"),
      dir.join("___etc_passwd.txt")
    );
  }
}
