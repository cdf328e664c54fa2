// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/control/smoother.rs - 锚点指数平滑
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

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
  /// 上一帧平滑值的权重，取值 [0, 1)；越小跟随越快
  pub factor: f32,
}

impl Default for SmootherConfig {
  fn default() -> Self {
    Self { factor: 0.5 }
  }
}

/// 一阶低通滤波器，重新锁定后的第一帧直接采用原始值
#[derive(Debug, Clone)]
pub struct PositionSmoother {
  factor: f32,
  state: Option<(f32, f32)>,
}

impl PositionSmoother {
  pub fn new(config: SmootherConfig) -> Self {
    Self {
      factor: config.factor,
      state: None,
    }
  }

  pub fn smooth(&mut self, raw_x: f32, raw_y: f32) -> (f32, f32) {
    let next = match self.state {
      None => (raw_x, raw_y),
      Some((x, y)) => (
        self.factor * x + (1.0 - self.factor) * raw_x,
        self.factor * y + (1.0 - self.factor) * raw_y,
      ),
    };
    self.state = Some(next);
    next
  }

  pub fn reset(&mut self) {
    self.state = None;
  }

  pub fn current(&self) -> Option<(f32, f32)> {
    self.state
  }
}

impl Default for PositionSmoother {
  fn default() -> Self {
    Self::new(SmootherConfig::default())
  }
}
