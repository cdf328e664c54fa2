// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/status.rs - 台灯本体上报的状态
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

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("无法识别的本体状态: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStatus {
  /// 触摸开启，等同唤醒
  TouchListening,
  /// 触摸关闭，请求结束对话
  TouchMute,
  Heartbeat { chat_mode: bool },
  Pong,
  /// 设备发现应答
  Announce,
}

impl BodyStatus {
  pub fn is_wake(&self) -> bool {
    matches!(self, BodyStatus::TouchListening)
  }

  pub fn is_end_request(&self) -> bool {
    matches!(self, BodyStatus::TouchMute)
  }
}

impl FromStr for BodyStatus {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    match s {
      "STATUS:LISTENING" => Ok(BodyStatus::TouchListening),
      "STATUS:MUTE" => Ok(BodyStatus::TouchMute),
      "PONG" => Ok(BodyStatus::Pong),
      "LUMINA_BODY" => Ok(BodyStatus::Announce),
      _ => match s.strip_prefix("HEARTBEAT:") {
        Some(mode) => Ok(BodyStatus::Heartbeat {
          chat_mode: mode.contains("LISTENING"),
        }),
        None => Err(UnknownStatus(s.to_string())),
      },
    }
  }
}
