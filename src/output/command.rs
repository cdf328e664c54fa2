// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/command.rs - 台灯本体文本命令协议
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

use std::fmt;

/// OLED 表情
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Face {
  #[default]
  Sleep,
  Happy,
  Sad,
  Surprised,
  Thinking,
  Love,
  Listening,
}

impl Face {
  pub fn as_str(&self) -> &'static str {
    match self {
      Face::Sleep => "SLEEP",
      Face::Happy => "HAPPY",
      Face::Sad => "SAD",
      Face::Surprised => "SURPRISED",
      Face::Thinking => "THINKING",
      Face::Love => "LOVE",
      Face::Listening => "LISTENING",
    }
  }

  /// 情绪词到表情，未知词一律 HAPPY
  pub fn from_emotion(word: &str) -> Face {
    match word.trim().to_lowercase().as_str() {
      "happy" | "excited" | "laugh" | "haha" => Face::Happy,
      "love" => Face::Love,
      "sad" | "sorry" => Face::Sad,
      "think" | "hmm" | "wonder" => Face::Thinking,
      "wow" | "surprise" => Face::Surprised,
      _ => Face::Happy,
    }
  }
}

impl fmt::Display for Face {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
  pub const WHITE: Rgb = Rgb(255, 255, 255);

  /// 对话中可用的灯光颜色名
  pub fn named(name: &str) -> Option<Rgb> {
    let rgb = match name.trim().to_lowercase().as_str() {
      "red" => Rgb(255, 0, 0),
      "green" => Rgb(0, 255, 0),
      "blue" => Rgb(0, 0, 255),
      "yellow" => Rgb(255, 255, 0),
      "orange" => Rgb(255, 165, 0),
      "purple" => Rgb(128, 0, 128),
      "pink" => Rgb(255, 105, 180),
      "cyan" => Rgb(0, 255, 255),
      "white" => Rgb::WHITE,
      "warm" => Rgb(255, 200, 100),
      "cool" => Rgb(200, 220, 255),
      _ => return None,
    };
    Some(rgb)
  }
}

impl Default for Rgb {
  fn default() -> Self {
    Rgb::WHITE
  }
}

pub const MAX_BRIGHTNESS: u8 = 100;

/// 发往台灯本体的单条命令，发送即忘，不等待应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  ServoPan(i32),
  ServoTilt(i32),
  ServoEnable,
  Face(Face),
  TalkStart,
  TalkStop,
  Brightness(u8),
  Color(Rgb),
  ChatStart,
  ChatStop,
  Ping,
}

impl Command {
  pub fn brightness(level: i32) -> Command {
    Command::Brightness(level.clamp(0, MAX_BRIGHTNESS as i32) as u8)
  }

  pub fn is_servo(&self) -> bool {
    matches!(self, Command::ServoPan(_) | Command::ServoTilt(_))
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Command::ServoPan(angle) => write!(f, "SERVO_PAN:{angle}"),
      Command::ServoTilt(angle) => write!(f, "SERVO_TILT:{angle}"),
      Command::ServoEnable => f.write_str("SERVO_ENABLE"),
      Command::Face(face) => write!(f, "F_{face}"),
      Command::TalkStart => f.write_str("F_TALK_START"),
      Command::TalkStop => f.write_str("F_TALK_STOP"),
      Command::Brightness(level) => write!(f, "B{}", level.min(&MAX_BRIGHTNESS)),
      Command::Color(Rgb(r, g, b)) => write!(f, "C{r},{g},{b}"),
      Command::ChatStart => f.write_str("CHAT_START"),
      Command::ChatStop => f.write_str("CHAT_STOP"),
      Command::Ping => f.write_str("PING"),
    }
  }
}
