use teloxide::{
  prelude::*,
  types::{InlineKeyboardButton, InlineKeyboardMarkup},
  utils::command::BotCommands,
};

use super::{ReplyBot, callback::Callback};
use crate::{
  entity::Language,
  i18n::{self, Key},
  llm::ChatModel,
  prelude::*,
  state::{AppState, Services},
  sv::{GrantStatus, premium::MAX_GRANT_DAYS},
};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
  /// Register and show the welcome message
  Start,
  /// Subscription status and offer
  Premium,
  /// Choose a model
  Model,
  /// Change language
  Language,
  Help,
  // Admin commands below
  Grant(String),
  Info(String),
  Stats,
}

const ADMIN_HELP: &str = "\
<b>📋 Admin Commands</b>

/grant &lt;user_id&gt; [days] [limit] - Issue or renew premium
/info &lt;user_id&gt; - Show user, premium and usage
/stats - Show totals";

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  let sv = app.sv();
  let lang = super::language_of(&app, bot.user_id).await;

  match cmd {
    Command::Start => {
      bot.reply_html(i18n::text(lang, Key::Welcome)).await?;
    }
    Command::Premium => {
      let text = match premium_text(&app, &sv, lang, bot.user_id).await {
        Ok(text) => text,
        Err(err) => super::failure_text(lang, &err),
      };
      bot.reply_with_keyboard(text, premium_keyboard(lang)).await?;
    }
    Command::Model => {
      bot
        .reply_with_keyboard(
          i18n::text(lang, Key::SelectModel),
          model_keyboard(app.model_of(bot.user_id)),
        )
        .await?;
    }
    Command::Language => {
      bot
        .reply_with_keyboard(
          i18n::text(lang, Key::SelectLanguage),
          language_keyboard(),
        )
        .await?;
    }
    Command::Help if app.is_admin(bot.user_id) => {
      bot
        .reply_html(format!("{}\n\n{ADMIN_HELP}", i18n::text(lang, Key::Help)))
        .await?;
    }
    Command::Help => {
      bot.reply_html(i18n::text(lang, Key::Help)).await?;
    }
    cmd if app.is_admin(bot.user_id) => {
      handle_admin_command(&app, &sv, &bot, cmd).await?;
    }
    _ => {}
  }

  Ok(())
}

async fn premium_text(
  app: &AppState,
  sv: &Services<'_>,
  lang: Language,
  user_id: i64,
) -> Result<String> {
  let offer = i18n::format(
    lang,
    Key::PremiumInfo,
    &[
      ("days", &app.config.premium_days.to_string()),
      ("limit", &app.config.premium_prompt_limit.to_string()),
    ],
  );

  let status = match sv.entitlement.status(user_id).await? {
    GrantStatus::None => return Ok(offer),
    GrantStatus::Active { remaining, end_date } => i18n::format(
      lang,
      Key::PremiumActive,
      &[
        ("end", &utils::format_date(end_date)),
        ("remaining", &remaining.to_string()),
      ],
    ),
    GrantStatus::Expired => i18n::text(lang, Key::PremiumExpired).into(),
    GrantStatus::Exhausted => i18n::text(lang, Key::PremiumExhausted).into(),
  };

  Ok(format!("{offer}\n\n{status}"))
}

fn premium_keyboard(lang: Language) -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
    i18n::text(lang, Key::PremiumButton),
    Callback::GetPremium.to_data(),
  )]])
}

fn model_keyboard(current: ChatModel) -> InlineKeyboardMarkup {
  let rows = ChatModel::ALL.into_iter().map(|model| {
    let label = if model == current {
      format!("✅ {}", model.display_name())
    } else {
      model.display_name().to_string()
    };
    vec![InlineKeyboardButton::callback(
      label,
      Callback::Model(model.key().into()).to_data(),
    )]
  });
  InlineKeyboardMarkup::new(rows)
}

fn language_keyboard() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new([Language::En, Language::Ru].map(|lang| {
    vec![InlineKeyboardButton::callback(
      lang.native_name(),
      Callback::Language(lang.code().into()).to_data(),
    )]
  }))
}

/// Parses `<user_id> [days] [limit]`, missing values come from the config.
fn parse_grant(args: &str, days: u32, limit: i32) -> Result<(i64, u32, i32)> {
  const USAGE: &str = "Usage: /grant <user_id> [days] [limit]";
  let usage = || Error::InvalidArgs(USAGE.into());

  let parts: Vec<&str> = args.split_whitespace().collect();
  let (user_id, days, limit) = match parts.as_slice() {
    [user_id] => (user_id.parse().ok(), Some(days), Some(limit)),
    [user_id, d] => (user_id.parse().ok(), d.parse().ok(), Some(limit)),
    [user_id, d, l] => (user_id.parse().ok(), d.parse().ok(), l.parse().ok()),
    _ => return Err(usage()),
  };

  match (user_id, days, limit) {
    (Some(user_id), Some(days), Some(limit))
      if days <= MAX_GRANT_DAYS && limit > 0 =>
    {
      Ok((user_id, days, limit))
    }
    _ => Err(usage()),
  }
}

async fn process_info_command(
  sv: &Services<'_>,
  bot: &ReplyBot,
  input: &str,
) -> Result<String> {
  let user_id: i64 = input
    .trim()
    .parse()
    .map_err(|_| Error::InvalidArgs("Usage: /info <user_id>".into()))?;

  let user = sv.user.by_id(user_id).await?.ok_or(Error::UserNotFound)?;
  let username = bot.infer_username(ChatId(user_id)).await;
  let prompts = sv.prompt.count_by_user(user_id).await?;

  let premium = match sv.premium.by_user(user_id).await? {
    Some(grant) => {
      let status = match GrantStatus::of(Some(&grant), Utc::now().naive_utc()) {
        GrantStatus::Active { .. } => "🟢 Active",
        GrantStatus::Expired => "❌ Expired",
        GrantStatus::Exhausted => "⛔ Exhausted",
        GrantStatus::None => "📂 None",
      };
      format!(
        "{}\n\
        Period: {} - {}\n\
        Prompts: {}/{}",
        status,
        utils::format_date(grant.start_date),
        utils::format_date(grant.end_date),
        grant.prompts_used,
        grant.prompt_limit
      )
    }
    None => "📂 No premium".into(),
  };

  let mut recent = String::new();
  for record in sv.prompt.by_user(user_id, 3).await? {
    let preview: String = record.prompt_text.chars().take(60).collect();
    recent.push_str(&format!(
      "\n{} <i>{}</i>",
      utils::format_date(record.created_at),
      utils::escape_html(&preview)
    ));
  }

  Ok(format!(
    "👤 <b>User Info</b>\n\
    ID: <code>{}</code>\n\
    Name: {}\n\
    Language: {}\n\
    Registered: {}\n\
    Prompts total: {}{}\n\n\
    💎 <b>Premium</b>\n\
    {}",
    user.tg_user_id,
    username,
    user.language.code(),
    utils::format_date(user.created_at),
    prompts,
    recent,
    premium
  ))
}

async fn handle_admin_command(
  app: &AppState,
  sv: &Services<'_>,
  bot: &ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  let result: Result<String> = match cmd {
    Command::Grant(args) => {
      async {
        let (user_id, days, limit) = parse_grant(
          &args,
          app.config.premium_days,
          app.config.premium_prompt_limit,
        )?;
        let grant = sv.entitlement.grant(user_id, days, limit).await?;
        Ok(format!(
          "✅ Premium granted to <code>{}</code>\n\
          Until: {}\n\
          Prompts: {}",
          grant.user_id,
          utils::format_date(grant.end_date),
          grant.prompt_limit
        ))
      }
      .await
    }

    Command::Info(input) => process_info_command(sv, bot, &input).await,

    Command::Stats => {
      async {
        Ok(format!(
          "Users: {}\n\
          Active premium: {}\n\
          Prompts: {}",
          sv.user.count().await?,
          sv.premium.count_active().await?,
          sv.prompt.count().await?
        ))
      }
      .await
    }

    _ => return Ok(()),
  };

  match result {
    Ok(text) => {
      bot.reply_html(text).await?;
    }
    Err(e) => {
      if e.is_external() {
        error!("Admin command failed: {e}");
      }
      let text = format!("❌ {}", utils::escape_html(&e.user_message()));
      bot.reply_html(text).await?;
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grant_args_defaults() {
    assert_eq!(parse_grant("42", 30, 100).unwrap(), (42, 30, 100));
    assert_eq!(parse_grant("42 7", 30, 100).unwrap(), (42, 7, 100));
    assert_eq!(parse_grant(" 42  7  5 ", 30, 100).unwrap(), (42, 7, 5));
  }

  #[test]
  fn grant_args_invalid() {
    for args in
      ["", "abc", "42 -1", "42 7 0", "42 7 x", "1 2 3 4", "42 4000000000"]
    {
      assert!(
        matches!(parse_grant(args, 30, 100), Err(Error::InvalidArgs(_))),
        "{args}"
      );
    }
  }

  #[test]
  fn grant_args_period_cap() {
    let max = MAX_GRANT_DAYS.to_string();
    assert_eq!(
      parse_grant(&format!("42 {max}"), 30, 100).unwrap(),
      (42, MAX_GRANT_DAYS, 100)
    );
    let over = (MAX_GRANT_DAYS + 1).to_string();
    assert!(parse_grant(&format!("42 {over}"), 30, 100).is_err());
  }

  #[test]
  fn commands_parse() {
    let cmd = Command::parse("/grant 42 7", "bot").ok();
    assert!(matches!(cmd, Some(Command::Grant(args)) if args == "42 7"));
    assert!(matches!(
      Command::parse("/language", "bot"),
      Ok(Command::Language)
    ));
  }

  #[test]
  fn model_keyboard_marks_current() {
    let kb = model_keyboard(ChatModel::Gpt4);
    assert_eq!(kb.inline_keyboard.len(), ChatModel::ALL.len());
    assert_eq!(kb.inline_keyboard[1][0].text, "✅ GPT-4");
    assert_eq!(kb.inline_keyboard[0][0].text, "GPT-3.5 Turbo");
  }
}
