mod callback;
mod command;
mod message;

use command::Command;
use teloxide::{
  Bot,
  dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
  prelude::*,
  types::{
    CallbackQuery, CallbackQueryId, ChatId, InlineKeyboardMarkup, Message,
    ParseMode, Update, User,
  },
};

use crate::{
  entity::Language,
  i18n::{self, Key},
  prelude::*,
  state::AppState,
};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    run_bot(app).await;
    Ok(())
  }
}

pub async fn run_bot(app: Arc<AppState>) {
  info!("Starting Telegram bot...");

  let bot = app.bot.clone();

  let handler = teloxide::dptree::entry()
    .branch(Update::filter_message().filter_command::<Command>().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message, cmd: Command| {
        let app = app.clone();
        async move {
          let bot = ReplyBot::from_message(bot, &msg);
          register(&app, msg.from.as_ref(), bot.user_id).await;
          command::handle(app, bot, cmd).await
        }
      }
    }))
    .branch(Update::filter_message().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message| {
        let app = app.clone();
        async move {
          let bot = ReplyBot::from_message(bot, &msg);
          register(&app, msg.from.as_ref(), bot.user_id).await;
          message::handle(app, bot, msg).await
        }
      }
    }))
    .branch(Update::filter_callback_query().endpoint({
      let app = app.clone();
      move |bot: Bot, query: CallbackQuery| {
        let app = app.clone();
        callback_handle(app, bot, query)
      }
    }));

  Dispatcher::builder(bot, handler).build().dispatch().await;
}

/// Makes sure every sender has a user row with a fresh display name.
async fn register(app: &AppState, from: Option<&User>, user_id: i64) {
  let username = from.and_then(|user| user.username.clone());
  if let Err(err) = app.sv().user.upsert(user_id, username).await {
    error!("Failed to register user {user_id}: {err}");
  }
}

async fn callback_handle(
  app: Arc<AppState>,
  bot: Bot,
  query: CallbackQuery,
) -> ResponseResult<()> {
  let Some(msg) = query.message.as_ref() else {
    bot.answer_callback_query(query.id.clone()).await?;
    return Ok(());
  };

  let bot = ReplyBot::new(bot, query.from.id.0 as i64, msg.chat().id);
  register(&app, Some(&query.from), bot.user_id).await;

  let data = query.data.as_deref().unwrap_or_default();
  callback::handle(app, bot, query.id, data).await
}

/// Resolves the language of the sender, falling back to the default.
async fn language_of(app: &AppState, user_id: i64) -> Language {
  match app.sv().user.language(user_id).await {
    Ok(lang) => lang,
    Err(err) => {
      warn!("Failed to read language of {user_id}: {err}");
      Language::default()
    }
  }
}

/// Maps an error to the text shown in chat, logging failures of services.
fn failure_text(lang: Language, err: &Error) -> String {
  match err {
    Error::NotEntitled => i18n::text(lang, Key::PremiumRequired).into(),
    Error::UnknownOption(_) => i18n::text(lang, Key::UnknownOption).into(),
    err if err.is_external() => {
      error!("Request failed: {err}");
      i18n::text(lang, Key::Failure).into()
    }
    err => format!("❌ {}", utils::escape_html(&err.user_message())),
  }
}

#[derive(Debug, Clone)]
struct ReplyBot {
  inner: Bot,
  pub user_id: i64,
  pub chat_id: ChatId,
}

impl ReplyBot {
  pub fn new(inner: Bot, user_id: i64, chat_id: ChatId) -> Self {
    Self { inner, user_id, chat_id }
  }

  fn from_message(inner: Bot, msg: &Message) -> Self {
    let user_id =
      msg.from.as_ref().map(|user| user.id.0 as i64).unwrap_or(msg.chat.id.0);
    Self::new(inner, user_id, msg.chat.id)
  }

  async fn reply_html(
    &self,
    text: impl Into<String>,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .await
  }

  /// Sends plain text, split into several messages if it is too long.
  async fn reply_text_chunked(&self, text: &str) -> ResponseResult<()> {
    for chunk in utils::chunk_message(text, 0) {
      self.inner.send_message(self.chat_id, chunk).await?;
    }
    Ok(())
  }

  async fn reply_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await
  }

  async fn alert(
    &self,
    query_id: CallbackQueryId,
    text: impl Into<String>,
  ) -> ResponseResult<()> {
    self
      .inner
      .answer_callback_query(query_id)
      .text(text.into())
      .show_alert(true)
      .await?;
    Ok(())
  }

  async fn infer_username(&self, chat_id: ChatId) -> String {
    match self.inner.get_chat(chat_id).await {
      Ok(chat) => {
        if let Some(username) = chat.username() {
          format!("@{}", username)
        } else {
          format!("<a href=\"tg://user?id={}\">unknown</a>", chat_id)
        }
      }
      Err(_) => format!("<code>{}</code> (API Error)", chat_id),
    }
  }
}
