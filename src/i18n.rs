//! User-facing strings in every supported language.
//!
//! Templates use `{name}` placeholders filled by [`format`].

use crate::entity::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Welcome,
  Help,
  PremiumInfo,
  PremiumButton,
  PremiumActive,
  PremiumExpired,
  PremiumExhausted,
  PremiumSuccess,
  PremiumRequired,
  SelectModel,
  ModelSelected,
  SelectLanguage,
  LanguageSet,
  FileSaved,
  UnknownOption,
  Failure,
}

impl Key {
  #[cfg(test)]
  const ALL: [Key; 16] = [
    Key::Welcome,
    Key::Help,
    Key::PremiumInfo,
    Key::PremiumButton,
    Key::PremiumActive,
    Key::PremiumExpired,
    Key::PremiumExhausted,
    Key::PremiumSuccess,
    Key::PremiumRequired,
    Key::SelectModel,
    Key::ModelSelected,
    Key::SelectLanguage,
    Key::LanguageSet,
    Key::FileSaved,
    Key::UnknownOption,
    Key::Failure,
  ];
}

pub fn text(lang: Language, key: Key) -> &'static str {
  match lang {
    Language::En => en(key),
    Language::Ru => ru(key),
  }
}

/// Looks up `key` and substitutes `{name}` placeholders from `params`.
pub fn format(lang: Language, key: Key, params: &[(&str, &str)]) -> String {
  let mut out = text(lang, key).to_string();
  for (name, value) in params {
    out = out.replace(&format!("{{{name}}}"), value);
  }
  out
}

fn en(key: Key) -> &'static str {
  match key {
    Key::Welcome => {
      "👋 <b>Welcome!</b>\n\n\
      I answer your questions with a GPT model.\n\
      /premium - get a subscription\n\
      /model - choose a model\n\
      /language - change language"
    }
    Key::Help => {
      "/start - main info\n\
      /premium - subscription status and offer\n\
      /model - choose a model\n\
      /language - change language"
    }
    Key::PremiumInfo => {
      "💎 <b>Premium</b>\n\n\
      {days} days, up to {limit} prompts.\n\
      Text messages and documents are available with premium only."
    }
    Key::PremiumButton => "💎 Get premium",
    Key::PremiumActive => {
      "✅ Your premium is active until {end}, {remaining} prompts left."
    }
    Key::PremiumExpired => "⌛ Your premium has expired.",
    Key::PremiumExhausted => "🚫 You have used all prompts of your premium.",
    Key::PremiumSuccess => "🎉 Premium activated!",
    Key::PremiumRequired => {
      "🔒 This feature requires an active premium subscription. See /premium"
    }
    Key::SelectModel => "Select a model:",
    Key::ModelSelected => "Model set to {model}",
    Key::SelectLanguage => "Select your language:",
    Key::LanguageSet => "Language set to {lang}",
    Key::FileSaved => "📄 File saved.",
    Key::UnknownOption => "❓ Unrecognized option.",
    Key::Failure => "❌ Something went wrong, please try again later.",
  }
}

fn ru(key: Key) -> &'static str {
  match key {
    Key::Welcome => {
      "👋 <b>Добро пожаловать!</b>\n\n\
      Я отвечаю на ваши вопросы с помощью модели GPT.\n\
      /premium - оформить подписку\n\
      /model - выбрать модель\n\
      /language - сменить язык"
    }
    Key::Help => {
      "/start - основная информация\n\
      /premium - статус подписки\n\
      /model - выбрать модель\n\
      /language - сменить язык"
    }
    Key::PremiumInfo => {
      "💎 <b>Премиум</b>\n\n\
      {days} дней, до {limit} запросов.\n\
      Текстовые сообщения и документы доступны только с премиумом."
    }
    Key::PremiumButton => "💎 Получить премиум",
    Key::PremiumActive => {
      "✅ Премиум активен до {end}, осталось запросов: {remaining}."
    }
    Key::PremiumExpired => "⌛ Срок вашего премиума истёк.",
    Key::PremiumExhausted => "🚫 Вы использовали все запросы премиума.",
    Key::PremiumSuccess => "🎉 Премиум активирован!",
    Key::PremiumRequired => {
      "🔒 Для этой функции нужна активная премиум-подписка. См. /premium"
    }
    Key::SelectModel => "Выберите модель:",
    Key::ModelSelected => "Выбрана модель {model}",
    Key::SelectLanguage => "Выберите язык:",
    Key::LanguageSet => "Язык изменён на {lang}",
    Key::FileSaved => "📄 Файл сохранён.",
    Key::UnknownOption => "❓ Неизвестный вариант.",
    Key::Failure => "❌ Что-то пошло не так, попробуйте позже.",
  }
}
