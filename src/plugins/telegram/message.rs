use teloxide::{net::Download, prelude::*, types::Document};

use super::ReplyBot;
use crate::{
  i18n::{self, Key},
  prelude::*,
  state::AppState,
};

/// Free text goes to the model, documents are stored. Both need premium.
pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  msg: Message,
) -> ResponseResult<()> {
  if let Some(text) = msg.text() {
    return answer_prompt(&app, &bot, text).await;
  }

  if let Some(doc) = msg.document() {
    return save_document(&app, &bot, doc).await;
  }

  Ok(())
}

async fn answer_prompt(
  app: &AppState,
  bot: &ReplyBot,
  text: &str,
) -> ResponseResult<()> {
  match app.ask(bot.user_id, text).await {
    Ok(reply) => bot.reply_text_chunked(&reply).await,
    Err(err) => {
      let lang = super::language_of(app, bot.user_id).await;
      bot.reply_html(super::failure_text(lang, &err)).await?;
      Ok(())
    }
  }
}

async fn save_document(
  app: &AppState,
  bot: &ReplyBot,
  doc: &Document,
) -> ResponseResult<()> {
  let result: Result<()> = async {
    app.ensure_entitled(bot.user_id).await?;

    let file = bot.inner.get_file(doc.file.id.clone()).await?;
    let mut content = Vec::new();
    bot.inner.download_file(&file.path, &mut content).await?;

    app
      .store_attachment(bot.user_id, &doc.file.id.0, content.as_slice())
      .await?;
    Ok(())
  }
  .await;

  let lang = super::language_of(app, bot.user_id).await;
  let text = match result {
    Ok(()) => i18n::text(lang, Key::FileSaved).to_string(),
    Err(err) => super::failure_text(lang, &err),
  };
  bot.reply_html(text).await?;

  Ok(())
}
