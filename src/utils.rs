use crate::prelude::*;

pub fn format_date(date: DateTime) -> String {
  date.format("%d.%m.%Y %H:%M").to_string()
}

/// Maximum message length for Telegram Bot API (4096 characters).
/// Kept below that to leave room for HTML entity expansion.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4000;

/// Splits a long message into chunks that fit within Telegram's message limit.
/// Attempts to split at newline boundaries to preserve formatting.
///
/// Lengths are counted in chars, model replies are rarely ASCII-only.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
  let max_len =
    if max_len == 0 { TELEGRAM_MAX_MESSAGE_LENGTH } else { max_len };

  if text.chars().count() <= max_len {
    return vec![text.to_string()];
  }

  let mut chunks = Vec::new();
  let mut current = String::new();
  let mut current_len = 0;

  for line in text.lines() {
    let line_len = line.chars().count();

    if current_len > 0 && current_len + line_len + 1 > max_len {
      chunks.push(std::mem::take(&mut current));
      current_len = 0;
    }

    if line_len > max_len {
      if current_len > 0 {
        chunks.push(std::mem::take(&mut current));
        current_len = 0;
      }
      let chars: Vec<char> = line.chars().collect();
      let mut pieces = chars.chunks(max_len).peekable();
      while let Some(piece) = pieces.next() {
        if pieces.peek().is_some() {
          chunks.push(piece.iter().collect());
        } else {
          current = piece.iter().collect();
          current_len = piece.len();
        }
      }
    } else {
      if current_len > 0 {
        current.push('\n');
        current_len += 1;
      }
      current.push_str(line);
      current_len += line_len;
    }
  }

  if !current.is_empty() {
    chunks.push(current);
  }

  chunks
}

/// Escapes text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '&' => out.push_str("&amp;"),
      _ => out.push(ch),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_message_single_chunk() {
    assert_eq!(chunk_message("hello", 0), vec!["hello".to_string()]);
  }

  #[test]
  fn splits_on_lines() {
    let chunks = chunk_message("aaaa\nbbbb\ncccc", 9);
    assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
  }

  #[test]
  fn splits_long_line_on_char_boundaries() {
    let text = "я".repeat(10);
    let chunks = chunk_message(&text, 4);
    assert_eq!(chunks, vec!["яяяя", "яяяя", "яя"]);
  }

  #[test]
  fn chunks_respect_limit() {
    let text = "line of text\n".repeat(1000);
    for chunk in chunk_message(&text, 0) {
      assert!(chunk.chars().count() <= TELEGRAM_MAX_MESSAGE_LENGTH);
    }
  }

  #[test]
  fn escapes_html() {
    assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
  }
}
