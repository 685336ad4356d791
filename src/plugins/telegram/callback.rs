use teloxide::{prelude::*, types::CallbackQueryId};

use super::ReplyBot;
use crate::{
  entity::Language,
  i18n::{self, Key},
  llm::ChatModel,
  prelude::*,
  state::AppState,
};

/// Callback data enum - provides type-safe callback handling
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
  GetPremium,
  Model(String),
  Language(String),
}

impl Callback {
  /// Serialize callback to string for Telegram API
  pub fn to_data(&self) -> String {
    match self {
      Callback::GetPremium => "get_premium".to_string(),
      Callback::Model(key) => format!("model:{key}"),
      Callback::Language(code) => format!("lang:{code}"),
    }
  }

  /// Parse callback from string received from Telegram API
  pub fn from_data(data: &str) -> Option<Self> {
    if data == "get_premium" {
      return Some(Callback::GetPremium);
    }
    if let Some(key) = data.strip_prefix("model:") {
      return Some(Callback::Model(key.to_string()));
    }
    if let Some(code) = data.strip_prefix("lang:") {
      return Some(Callback::Language(code.to_string()));
    }
    None
  }
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  query_id: CallbackQueryId,
  data: &str,
) -> ResponseResult<()> {
  let lang = super::language_of(&app, bot.user_id).await;

  let text = match process(&app, bot.user_id, data).await {
    Ok(text) => text,
    Err(err) => {
      if let Error::UnknownOption(option) = &err {
        warn!("Unrecognized callback `{option}` from {}", bot.user_id);
      }
      super::failure_text(lang, &err)
    }
  };

  bot.alert(query_id, text).await
}

/// Applies the callback and returns the acknowledgment text.
async fn process(app: &AppState, user_id: i64, data: &str) -> Result<String> {
  let callback = Callback::from_data(data)
    .ok_or_else(|| Error::UnknownOption(data.to_string()))?;

  match callback {
    Callback::GetPremium => {
      let sv = app.sv();
      let days = app.config.premium_days;
      let limit = app.config.premium_prompt_limit;
      sv.entitlement.grant(user_id, days, limit).await?;

      let lang = sv.user.language(user_id).await?;
      Ok(i18n::text(lang, Key::PremiumSuccess).into())
    }
    Callback::Model(key) => {
      let model =
        ChatModel::from_key(&key).ok_or(Error::UnknownOption(key))?;
      app.select_model(user_id, model);

      let lang = app.sv().user.language(user_id).await?;
      Ok(i18n::format(
        lang,
        Key::ModelSelected,
        &[("model", model.display_name())],
      ))
    }
    Callback::Language(code) => {
      let lang = Language::from_code(&code).ok_or(Error::UnknownOption(code))?;
      app.sv().user.set_language(user_id, lang).await?;

      Ok(i18n::format(lang, Key::LanguageSet, &[("lang", lang.native_name())]))
    }
  }
}
