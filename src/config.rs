// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/config.rs - 跟踪参数配置
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

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
  control::{HandLossPolicy, ServoConfig, SmootherConfig},
  model::GestureConfig,
  output::LimiterConfig,
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("解析配置文件失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("配置项 {field} 无效: {reason}")]
  Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
  ConfigError::Invalid {
    field,
    reason: reason.into(),
  }
}

/// 全部跟踪参数；JSON 文件中只需写出要覆盖的字段
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
  pub gesture: GestureConfig,
  pub smoother: SmootherConfig,
  pub servo: ServoConfig,
  pub limiter: LimiterConfig,
  pub hand_loss: HandLossPolicy,
}

impl TrackerConfig {
  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let config: TrackerConfig = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("读取配置文件 {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let g = &self.gesture;
    if !(g.min_aspect_ratio >= 0.0) {
      return Err(invalid("gesture.min_aspect_ratio", "必须非负"));
    }
    if !(0.0..=1.0).contains(&g.openness_threshold) {
      return Err(invalid("gesture.openness_threshold", "必须在 [0, 1] 内"));
    }
    if !(g.finger_gap_threshold > 0.0) {
      return Err(invalid("gesture.finger_gap_threshold", "必须为正"));
    }
    if !(g.palm_normal_epsilon >= 0.0) {
      return Err(invalid("gesture.palm_normal_epsilon", "必须非负"));
    }

    if !(0.0..1.0).contains(&self.smoother.factor) {
      return Err(invalid("smoother.factor", "必须在 [0, 1) 内"));
    }

    let s = &self.servo;
    if !(s.deadzone >= 0.0) {
      return Err(invalid("servo.deadzone", "必须非负"));
    }
    if !(s.pan_min <= s.pan_max) {
      return Err(invalid("servo.pan_min", "下限大于上限"));
    }
    if !(s.tilt_min <= s.tilt_max) {
      return Err(invalid("servo.tilt_min", "下限大于上限"));
    }
    if !(s.pan_min..=s.pan_max).contains(&s.home_pan) {
      return Err(invalid("servo.home_pan", "不在转动范围内"));
    }
    if !(s.tilt_min..=s.tilt_max).contains(&s.home_tilt) {
      return Err(invalid("servo.home_tilt", "不在转动范围内"));
    }
    if !(s.pan_gain.is_finite() && s.tilt_gain.is_finite()) {
      return Err(invalid("servo.pan_gain", "增益必须是有限值"));
    }

    Ok(())
  }
}
