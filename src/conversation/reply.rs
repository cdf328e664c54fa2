// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/conversation/reply.rs - 对话回复文本解析
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use tracing::debug;

use crate::{
  conversation::{EndReason, SessionEvent},
  output::{Command, Face, Rgb},
};

const END_MARKER: &str = "CONVERSATION_END";

// 按顺序匹配，先命中者生效
const EMOTION_KEYWORDS: [(Face, &[&str]); 5] = [
  (Face::Happy, &["haha", "laugh", "😂", "funny", "joke"]),
  (Face::Love, &["love", "heart", "❤", "sweet", "cute"]),
  (Face::Sad, &["sad", "sorry", "unfortunately", "oh no"]),
  (Face::Surprised, &["wow", "amazing", "incredible", "!"]),
  (Face::Thinking, &["hmm", "think", "let me", "wonder"]),
];

fn detect_emotion(text: &str) -> Option<Face> {
  let lower = text.to_lowercase();
  EMOTION_KEYWORDS
    .iter()
    .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
    .map(|(face, _)| *face)
}

/// `[KEY:VALUE]` 控制标记转成事件，并从显示文本中去掉
fn control_token(key: &str, value: &str) -> Option<SessionEvent> {
  match key {
    "BRIGHTNESS" => {
      let level = value.trim().parse::<i32>().ok()?;
      match Command::brightness(level) {
        Command::Brightness(level) => Some(SessionEvent::Brightness(level)),
        _ => None,
      }
    }
    "COLOR" => Rgb::named(value).map(SessionEvent::Color),
    "EMOTION" => Some(SessionEvent::Emotion(Face::from_emotion(value))),
    _ => None,
  }
}

/// 把对话服务的一段文字回复转换为有类型的事件
///
/// 事件顺序：控制标记、表情、显示文本，最后是结束标记。
/// 带有 `[EMOTION:...]` 标记时不再从文本猜测表情。
pub fn parse_reply(text: &str) -> Vec<SessionEvent> {
  let mut events = Vec::new();
  let mut display = String::with_capacity(text.len());
  let mut rest = text;

  while let Some(open) = rest.find('[') {
    display.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let token = after
      .find(']')
      .map(|close| (&after[..close], &after[close + 1..]));
    match token {
      Some((inner, tail)) => {
        let parsed = inner
          .split_once(':')
          .and_then(|(key, value)| control_token(key.trim(), value));
        match parsed {
          Some(event) => events.push(event),
          None => {
            debug!("忽略未知标记 [{}]", inner);
            display.push('[');
            display.push_str(inner);
            display.push(']');
          }
        }
        rest = tail;
      }
      None => {
        display.push_str(&rest[open..]);
        rest = "";
      }
    }
  }
  display.push_str(rest);

  let ended = display.contains(END_MARKER);
  let display = display.replace(END_MARKER, "");
  let display = display.split_whitespace().collect::<Vec<_>>().join(" ");

  let tagged = events
    .iter()
    .any(|e| matches!(e, SessionEvent::Emotion(_)));
  if !tagged {
    if let Some(face) = detect_emotion(&display) {
      events.push(SessionEvent::Emotion(face));
    }
  }
  if !display.is_empty() {
    events.push(SessionEvent::Text(display));
  }
  if ended {
    events.push(SessionEvent::Ended(EndReason::Remote));
  }
  events
}
