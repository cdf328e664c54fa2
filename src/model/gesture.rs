// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/model/gesture.rs - 锁定手势分类器
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

use std::{convert::Infallible, fmt};

use serde::Deserialize;
use tracing::debug;

use crate::{
  frame::{DetectedHand, HandFrame, Handedness, LandmarkSet, landmark},
  model::{
    Model,
    geometry::{GeometryError, Vec3, distance, palm_normal},
  },
};

// 张开的手通常高宽比 1.5 - 1.8，握拳约 0.8 - 1.1
const MIN_ASPECT_RATIO: f32 = 1.3;
const OPENNESS_THRESHOLD: f32 = 0.85;
const FINGER_GAP_THRESHOLD: f32 = 0.08;
const PALM_NORMAL_EPSILON: f32 = 0.002;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
  /// 外接框高宽比下限（像素空间）
  pub min_aspect_ratio: f32,
  /// 手指伸直度下限
  pub openness_threshold: f32,
  /// 相邻指尖的最大归一化间距
  pub finger_gap_threshold: f32,
  /// 掌心法向量 z 分量的判定死区
  pub palm_normal_epsilon: f32,
}

impl Default for GestureConfig {
  fn default() -> Self {
    Self {
      min_aspect_ratio: MIN_ASPECT_RATIO,
      openness_threshold: OPENNESS_THRESHOLD,
      finger_gap_threshold: FINGER_GAP_THRESHOLD,
      palm_normal_epsilon: PALM_NORMAL_EPSILON,
    }
  }
}

/// 像素坐标外接框 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
  pub x_min: i32,
  pub y_min: i32,
  pub x_max: i32,
  pub y_max: i32,
}

impl BoundingBox {
  pub const EMPTY: BoundingBox = BoundingBox {
    x_min: 0,
    y_min: 0,
    x_max: 0,
    y_max: 0,
  };

  pub fn is_empty(&self) -> bool {
    *self == Self::EMPTY
  }

  pub fn width(&self) -> i32 {
    self.x_max - self.x_min
  }

  pub fn height(&self) -> i32 {
    self.y_max - self.y_min
  }
}

/// 计算像素空间外接框的高宽比，宽度为零时返回 (0, EMPTY)
pub fn aspect_ratio(landmarks: &LandmarkSet, width: u32, height: u32) -> (f32, BoundingBox) {
  let (w, h) = (width as f32, height as f32);
  let mut min_x = f32::INFINITY;
  let mut max_x = f32::NEG_INFINITY;
  let mut min_y = f32::INFINITY;
  let mut max_y = f32::NEG_INFINITY;
  for p in landmarks.points() {
    min_x = min_x.min(p.x);
    max_x = max_x.max(p.x);
    min_y = min_y.min(p.y);
    max_y = max_y.max(p.y);
  }

  let box_w = (max_x - min_x) * w;
  let box_h = (max_y - min_y) * h;
  if box_w == 0.0 {
    return (0.0, BoundingBox::EMPTY);
  }

  let bbox = BoundingBox {
    x_min: (min_x * w) as i32,
    y_min: (min_y * h) as i32,
    x_max: (max_x * w) as i32,
    y_max: (max_y * h) as i32,
  };
  (box_h / box_w, bbox)
}

/// 四指伸直度，取最弯的一根；任一指尖比 PIP 更靠近手腕时直接为 0
pub fn finger_straightness(landmarks: &LandmarkSet) -> f32 {
  let wrist = landmarks.point(landmark::WRIST);
  let mut weakest = f32::INFINITY;

  for [mcp, pip, dip, tip] in landmark::FINGERS {
    let (mcp, pip, dip, tip) = (
      landmarks.point(mcp),
      landmarks.point(pip),
      landmarks.point(dip),
      landmarks.point(tip),
    );

    if distance(wrist, tip) < distance(wrist, pip) {
      return 0.0;
    }

    let path = distance(mcp, pip) + distance(pip, dip) + distance(dip, tip);
    let span = distance(mcp, tip);
    let score = if path > 0.0 { span / path } else { 0.0 };
    weakest = weakest.min(score);
  }

  weakest
}

/// 相邻指尖（食指→小指）间距都不超过阈值时视为并拢
pub fn fingers_together(landmarks: &LandmarkSet, max_gap: f32) -> bool {
  let tips = landmark::FINGERS.map(|finger| landmarks.point(finger[3]));
  tips.windows(2).all(|pair| distance(pair[0], pair[1]) <= max_gap)
}

/// 掌心朝向的判定来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSource {
  PalmNormal,
  /// 法向量不可用，退回拇指/小指 x 坐标比较
  Fallback2d(GeometryError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmOrientation {
  pub facing_camera: bool,
  pub normal: Option<Vec3>,
  pub source: OrientationSource,
}

/// 判断掌心还是手背朝向摄像头（镜像画面）
pub fn palm_orientation(
  landmarks: &LandmarkSet,
  handedness: Handedness,
  epsilon: f32,
) -> PalmOrientation {
  let (normal, reason) = match palm_normal(landmarks) {
    Ok(n) if n.z.abs() > epsilon => {
      let facing_camera = match handedness {
        Handedness::Right => n.z > 0.0,
        Handedness::Left => n.z < 0.0,
      };
      return PalmOrientation {
        facing_camera,
        normal: Some(n),
        source: OrientationSource::PalmNormal,
      };
    }
    Ok(n) => (Some(n), GeometryError::NearZeroNormal),
    Err(e) => (None, e),
  };

  let thumb_x = landmarks.point(landmark::THUMB_TIP).x;
  let pinky_x = landmarks.point(landmark::PINKY_TIP).x;
  let facing_camera = match handedness {
    Handedness::Right => thumb_x < pinky_x,
    Handedness::Left => thumb_x > pinky_x,
  };
  PalmOrientation {
    facing_camera,
    normal,
    source: OrientationSource::Fallback2d(reason),
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFeatures {
  pub aspect_ratio: f32,
  pub bbox: BoundingBox,
  pub straightness: f32,
  pub fingers_together: bool,
  pub palm: PalmOrientation,
}

/// 参与锁定判定的四个布尔条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureChecks {
  pub palm_facing: bool,
  pub tall_enough: bool,
  pub open: bool,
  pub together: bool,
}

impl GestureFeatures {
  pub fn checks(&self, config: &GestureConfig) -> GestureChecks {
    GestureChecks {
      palm_facing: self.palm.facing_camera,
      tall_enough: self.aspect_ratio > config.min_aspect_ratio,
      open: self.straightness > config.openness_threshold,
      together: self.fingers_together,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPath {
  /// 掌心朝前，需要足够的高宽比
  Palm,
  /// 手背朝前，任意旋转角度均可
  Nails,
}

/// 锁定策略：掌心路径或手背路径任一成立
pub fn lock_path(checks: &GestureChecks) -> Option<LockPath> {
  if !checks.open || !checks.together {
    return None;
  }
  match (checks.palm_facing, checks.tall_enough) {
    (true, true) => Some(LockPath::Palm),
    (true, false) => None,
    (false, _) => Some(LockPath::Nails),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
  Idle,
  Locked(LockPath),
  NotPalmFacing,
  RatioTooLow,
  FingersCurled,
  HoldUpright,
}

impl LockStatus {
  pub fn label(&self) -> &'static str {
    match self {
      LockStatus::Idle => "IDLE",
      LockStatus::Locked(_) => "LOCKED",
      LockStatus::NotPalmFacing => "Show Palm",
      LockStatus::RatioTooLow => "Open Wider",
      LockStatus::FingersCurled => "Straighten Fingers",
      LockStatus::HoldUpright => "Hold Upright",
    }
  }

  pub fn is_locked(&self) -> bool {
    matches!(self, LockStatus::Locked(_))
  }
}

impl fmt::Display for LockStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// 单帧锁定判定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDecision {
  pub locked: bool,
  pub status: LockStatus,
  pub bbox: BoundingBox,
  pub features: Option<GestureFeatures>,
}

impl GestureDecision {
  /// 画面中没有手
  pub fn idle() -> Self {
    Self {
      locked: false,
      status: LockStatus::Idle,
      bbox: BoundingBox::EMPTY,
      features: None,
    }
  }

  pub fn ratio(&self) -> f32 {
    self.features.map(|f| f.aspect_ratio).unwrap_or(0.0)
  }
}

impl fmt::Display for GestureDecision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.features {
      Some(features) => write!(f, "{} (Ratio: {:.2})", self.status, features.aspect_ratio),
      None => write!(f, "{}", self.status),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
  config: GestureConfig,
}

impl GestureClassifier {
  pub fn new(config: GestureConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &GestureConfig {
    &self.config
  }

  pub fn features(&self, hand: &DetectedHand, width: u32, height: u32) -> GestureFeatures {
    let landmarks = &hand.landmarks;
    let (ratio, bbox) = aspect_ratio(landmarks, width, height);
    GestureFeatures {
      aspect_ratio: ratio,
      bbox,
      straightness: finger_straightness(landmarks),
      fingers_together: fingers_together(landmarks, self.config.finger_gap_threshold),
      palm: palm_orientation(
        landmarks,
        hand.handedness,
        self.config.palm_normal_epsilon,
      ),
    }
  }

  pub fn classify(&self, hand: &DetectedHand, width: u32, height: u32) -> GestureDecision {
    let features = self.features(hand, width, height);
    let checks = features.checks(&self.config);

    let status = match lock_path(&checks) {
      Some(path) => LockStatus::Locked(path),
      None if !checks.palm_facing => LockStatus::NotPalmFacing,
      None if !checks.tall_enough => LockStatus::RatioTooLow,
      None if features.straightness == 0.0 => LockStatus::FingersCurled,
      None => LockStatus::HoldUpright,
    };

    debug!(
      "手势特征: 高宽比 {:.2}, 伸直度 {:.2}, 并拢 {}, 掌心朝前 {} ({:?}) -> {}",
      features.aspect_ratio,
      features.straightness,
      features.fingers_together,
      features.palm.facing_camera,
      features.palm.source,
      status
    );

    GestureDecision {
      locked: status.is_locked(),
      status,
      bbox: features.bbox,
      features: Some(features),
    }
  }
}

impl Model for GestureClassifier {
  type Input = HandFrame;
  type Output = GestureDecision;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(match &input.hand {
      Some(hand) => self.classify(hand, input.width, input.height),
      None => GestureDecision::idle(),
    })
  }
}
