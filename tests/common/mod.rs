// 该文件是 Lumina （流明台灯） 项目的一部分。
// tests/common/mod.rs - 集成测试共用的关键点与对话后端
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

#![allow(dead_code)]

use std::{
  thread,
  time::{Duration, Instant},
};

use lumina::{
  conversation::{ConversationBackend, EndReason, SessionContext, SessionError, SessionEvent},
  frame::{DetectedHand, HandFrame, Handedness, LANDMARK_COUNT, LandmarkSet, landmark::*},
};

pub const FRAME_INTERVAL_MS: u64 = 33;

/// 右手四指并拢，`bend` 为每个指节相对上一节的弯曲角（弧度），0 为完全伸直
pub fn hand_with_bend(bend: f32) -> LandmarkSet {
  let mut p = [(0.0f32, 0.0f32); LANDMARK_COUNT];
  p[WRIST] = (0.50, 0.95);
  p[THUMB_CMC] = (0.46, 0.88);
  p[THUMB_MCP] = (0.43, 0.80);
  p[THUMB_IP] = (0.41, 0.72);
  p[THUMB_TIP] = (0.40, 0.66);

  for (i, finger) in FINGERS.iter().enumerate() {
    let mcp = (0.44 + 0.04 * i as f32, 0.60);
    let pip = (mcp.0, mcp.1 - 0.08);
    let dip = (
      pip.0 + 0.06 * 0.3 * bend.sin(),
      pip.1 - 0.06 * bend.cos(),
    );
    let tip = (
      dip.0 + 0.06 * 0.3 * (2.0 * bend).sin(),
      dip.1 - 0.06 * (2.0 * bend).cos(),
    );
    p[finger[0]] = mcp;
    p[finger[1]] = pip;
    p[finger[2]] = dip;
    p[finger[3]] = tip;
  }
  LandmarkSet::from_xy(p)
}

pub fn open_palm() -> LandmarkSet {
  hand_with_bend(0.0)
}

/// 从握拳（100°）逐帧张开到完全伸直
pub fn fist_opening(frames: usize) -> Vec<LandmarkSet> {
  let last = frames.saturating_sub(1).max(1) as f32;
  (0..frames)
    .map(|k| hand_with_bend(100f32.to_radians() * (1.0 - k as f32 / last)))
    .collect()
}

/// 指尖卷回掌心，不会锁定
pub fn fist() -> LandmarkSet {
  hand_with_bend(100f32.to_radians())
}

pub fn right_hand(landmarks: LandmarkSet) -> DetectedHand {
  DetectedHand {
    handedness: Handedness::Right,
    landmarks,
  }
}

pub fn frame(index: u64, landmarks: Option<LandmarkSet>) -> HandFrame {
  let frame = HandFrame::empty(index, index * FRAME_INTERVAL_MS);
  match landmarks {
    Some(landmarks) => frame.with_hand(right_hand(landmarks)),
    None => frame,
  }
}

/// 以 `start` 为零点的第 `index` 帧时刻
pub fn at(start: Instant, index: u64) -> Instant {
  start + Duration::from_millis(index * FRAME_INTERVAL_MS)
}

/// 先发出预置事件；`end` 为 None 时一直等到被要求结束
#[derive(Clone, Default)]
pub struct ScriptedBackend {
  pub events: Vec<SessionEvent>,
  pub end: Option<EndReason>,
}

impl ScriptedBackend {
  pub fn waiting() -> Self {
    Self::default()
  }

  pub fn ending(events: Vec<SessionEvent>, reason: EndReason) -> Self {
    Self {
      events,
      end: Some(reason),
    }
  }
}

impl ConversationBackend for ScriptedBackend {
  fn run(&mut self, context: &SessionContext) -> Result<EndReason, SessionError> {
    for event in self.events.drain(..) {
      context.emit(event)?;
    }
    if let Some(reason) = self.end.take() {
      return Ok(reason);
    }
    while context.is_running() {
      thread::sleep(Duration::from_millis(5));
    }
    Ok(EndReason::User)
  }
}
