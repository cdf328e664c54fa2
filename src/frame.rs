// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/frame.rs - 手部关键点帧定义
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LANDMARK_COUNT: usize = 21;

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// 手部关键点索引（与 MediaPipe 手部模型一致）
pub mod landmark {
  pub const WRIST: usize = 0;
  pub const THUMB_CMC: usize = 1;
  pub const THUMB_MCP: usize = 2;
  pub const THUMB_IP: usize = 3;
  pub const THUMB_TIP: usize = 4;
  pub const INDEX_MCP: usize = 5;
  pub const INDEX_PIP: usize = 6;
  pub const INDEX_DIP: usize = 7;
  pub const INDEX_TIP: usize = 8;
  pub const MIDDLE_MCP: usize = 9;
  pub const MIDDLE_PIP: usize = 10;
  pub const MIDDLE_DIP: usize = 11;
  pub const MIDDLE_TIP: usize = 12;
  pub const RING_MCP: usize = 13;
  pub const RING_PIP: usize = 14;
  pub const RING_DIP: usize = 15;
  pub const RING_TIP: usize = 16;
  pub const PINKY_MCP: usize = 17;
  pub const PINKY_PIP: usize = 18;
  pub const PINKY_DIP: usize = 19;
  pub const PINKY_TIP: usize = 20;

  /// 四根非拇指手指 (MCP, PIP, DIP, TIP)，按解剖顺序排列
  pub const FINGERS: [[usize; 4]; 4] = [
    [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
    [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
    [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
    [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
  ];
}

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
  #[error("关键点数量错误: 期望 {LANDMARK_COUNT}, 实际 {0}")]
  LandmarkCount(usize),
  #[error("未知的左右手标签: {0}")]
  UnknownHandedness(String),
}

/// 单个关键点，x/y 归一化到 [0, 1]，z 为相对深度（可选）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
  pub x: f32,
  pub y: f32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub z: Option<f32>,
}

impl Landmark {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y, z: None }
  }

  pub fn with_z(x: f32, y: f32, z: f32) -> Self {
    Self { x, y, z: Some(z) }
  }

  pub fn depth(&self) -> f32 {
    self.z.unwrap_or(0.0)
  }
}

/// 一只手的 21 个关键点，数量在构造时保证
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
  points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
  pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
    Self { points }
  }

  pub fn from_xy(points: [(f32, f32); LANDMARK_COUNT]) -> Self {
    Self {
      points: points.map(|(x, y)| Landmark::new(x, y)),
    }
  }

  pub fn point(&self, index: usize) -> &Landmark {
    &self.points[index]
  }

  pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
    &self.points
  }

  pub fn points_mut(&mut self) -> &mut [Landmark; LANDMARK_COUNT] {
    &mut self.points
  }

  /// 关键点映射到像素坐标
  pub fn to_pixel(&self, index: usize, width: u32, height: u32) -> (f32, f32) {
    let p = &self.points[index];
    (p.x * width as f32, p.y * height as f32)
  }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
  type Error = FrameError;

  fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
    let count = points.len();
    let points: [Landmark; LANDMARK_COUNT] = points
      .try_into()
      .map_err(|_| FrameError::LandmarkCount(count))?;
    Ok(Self { points })
  }
}

impl From<LandmarkSet> for Vec<Landmark> {
  fn from(set: LandmarkSet) -> Self {
    set.points.to_vec()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
  Left,
  Right,
}

impl fmt::Display for Handedness {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Handedness::Left => write!(f, "Left"),
      Handedness::Right => write!(f, "Right"),
    }
  }
}

impl FromStr for Handedness {
  type Err = FrameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "left" | "l" => Ok(Handedness::Left),
      "right" | "r" => Ok(Handedness::Right),
      _ => Err(FrameError::UnknownHandedness(s.to_string())),
    }
  }
}

/// 关键点检测器对一只手的输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
  pub handedness: Handedness,
  pub landmarks: LandmarkSet,
}

/// 每帧输入：帧尺寸、可能存在的手，以及该帧伴随的唤醒事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
  #[serde(default)]
  pub index: u64,
  #[serde(default)]
  pub timestamp_ms: u64,
  #[serde(default = "default_width")]
  pub width: u32,
  #[serde(default = "default_height")]
  pub height: u32,
  #[serde(default)]
  pub hand: Option<DetectedHand>,
  #[serde(default)]
  pub wake: bool,
  /// 输入源在等待期间产出的保活帧，不携带检测结果
  #[serde(skip)]
  pub tick: bool,
}

fn default_width() -> u32 {
  DEFAULT_FRAME_WIDTH
}

fn default_height() -> u32 {
  DEFAULT_FRAME_HEIGHT
}

impl HandFrame {
  pub fn empty(index: u64, timestamp_ms: u64) -> Self {
    Self {
      index,
      timestamp_ms,
      width: DEFAULT_FRAME_WIDTH,
      height: DEFAULT_FRAME_HEIGHT,
      hand: None,
      wake: false,
      tick: false,
    }
  }

  /// 没有新检测结果时的保活帧，帧循环据此跳过识别
  pub fn tick(index: u64, timestamp_ms: u64) -> Self {
    Self {
      tick: true,
      ..Self::empty(index, timestamp_ms)
    }
  }

  pub fn with_hand(mut self, hand: DetectedHand) -> Self {
    self.hand = Some(hand);
    self
  }

  pub fn with_size(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }

  pub fn with_wake(mut self, wake: bool) -> Self {
    self.wake = wake;
    self
  }

  pub fn center(&self) -> (f32, f32) {
    (self.width as f32 / 2.0, self.height as f32 / 2.0)
  }
}
