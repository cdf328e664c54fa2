// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/control/servo.rs - 中心跟随舵机控制
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

use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
  /// 每像素误差对应的角度增量，负值反转该轴
  pub pan_gain: f32,
  pub tilt_gain: f32,
  /// 像素死区，小于该值的误差视为零
  pub deadzone: f32,
  pub pan_min: f32,
  pub pan_max: f32,
  pub tilt_min: f32,
  pub tilt_max: f32,
  pub home_pan: f32,
  pub home_tilt: f32,
}

impl Default for ServoConfig {
  fn default() -> Self {
    Self {
      pan_gain: 0.05,
      tilt_gain: 0.05,
      deadzone: 40.0,
      pan_min: 0.0,
      pan_max: 180.0,
      tilt_min: 45.0,
      tilt_max: 135.0,
      home_pan: 90.0,
      home_tilt: 90.0,
    }
  }
}

impl ServoConfig {
  pub fn home(&self) -> ServoPosition {
    ServoPosition {
      pan: self.home_pan,
      tilt: self.home_tilt,
    }
  }
}

/// 舵机角度（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoPosition {
  pub pan: f32,
  pub tilt: f32,
}

impl ServoPosition {
  pub fn new(pan: f32, tilt: f32) -> Self {
    Self { pan, tilt }
  }

  /// 下发用的整数角度
  pub fn rounded(&self) -> (i32, i32) {
    (self.pan.round() as i32, self.tilt.round() as i32)
  }
}

impl fmt::Display for ServoPosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "P:{:.0} T:{:.0}", self.pan, self.tilt)
  }
}

/// 比例积分式的中心跟随控制律：每帧把带死区的像素误差按增益累加到上一帧角度上
#[derive(Debug, Clone, Default)]
pub struct TrackingController {
  config: ServoConfig,
}

impl TrackingController {
  pub fn new(config: ServoConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ServoConfig {
    &self.config
  }

  fn apply_deadzone(&self, error: f32) -> f32 {
    if error.abs() < self.config.deadzone {
      0.0
    } else {
      error
    }
  }

  pub fn compute_servo_targets(
    &self,
    anchor: (f32, f32),
    frame: (u32, u32),
    previous: ServoPosition,
  ) -> ServoPosition {
    let c = &self.config;
    let error_x = self.apply_deadzone(anchor.0 - frame.0 as f32 / 2.0);
    let error_y = self.apply_deadzone(anchor.1 - frame.1 as f32 / 2.0);

    ServoPosition {
      pan: (previous.pan + c.pan_gain * error_x).clamp(c.pan_min, c.pan_max),
      tilt: (previous.tilt + c.tilt_gain * error_y).clamp(c.tilt_min, c.tilt_max),
    }
  }
}

/// 手势锁定丢失时舵机的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandLossPolicy {
  /// 保持最后一次下发的位置
  #[default]
  Hold,
  /// 回到初始位置
  ResetToHome,
}

impl FromStr for HandLossPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "hold" => Ok(HandLossPolicy::Hold),
      "reset" | "reset_to_home" | "home" => Ok(HandLossPolicy::ResetToHome),
      other => Err(format!("未知的丢失策略: {other}")),
    }
  }
}

/// 持有舵机状态，跨帧、跨状态保持
#[derive(Debug, Clone)]
pub struct ServoTracker {
  controller: TrackingController,
  policy: HandLossPolicy,
  position: ServoPosition,
}

impl ServoTracker {
  pub fn new(config: ServoConfig, policy: HandLossPolicy) -> Self {
    let position = config.home();
    Self {
      controller: TrackingController::new(config),
      policy,
      position,
    }
  }

  pub fn position(&self) -> ServoPosition {
    self.position
  }

  pub fn policy(&self) -> HandLossPolicy {
    self.policy
  }

  pub fn controller(&self) -> &TrackingController {
    &self.controller
  }

  pub fn track(&mut self, anchor: (f32, f32), frame: (u32, u32)) -> ServoPosition {
    self.position = self
      .controller
      .compute_servo_targets(anchor, frame, self.position);
    debug!("舵机目标 {}", self.position);
    self.position
  }

  /// 锁定丢失，返回需要下发的新位置（若有）
  pub fn release(&mut self) -> Option<ServoPosition> {
    match self.policy {
      HandLossPolicy::Hold => None,
      HandLossPolicy::ResetToHome => {
        self.position = self.controller.config().home();
        info!("手势丢失，舵机回到初始位置 {}", self.position);
        Some(self.position)
      }
    }
  }
}

impl Default for ServoTracker {
  fn default() -> Self {
    Self::new(ServoConfig::default(), HandLossPolicy::default())
  }
}
