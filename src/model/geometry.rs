// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/model/geometry.rs - 关键点几何运算
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

use thiserror::Error;

use crate::frame::{Landmark, LandmarkSet, landmark};

const MIN_EDGE_LENGTH: f32 = 1e-6;
const MIN_NORMAL_LENGTH: f32 = 1e-9;

/// 掌心法向量无法可靠计算的原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
  #[error("手腕到掌指关节的向量长度为零")]
  ZeroLengthEdge,
  #[error("掌指关节与手腕共线")]
  Collinear,
  #[error("法向量 z 分量接近零")]
  NearZeroNormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
  pub x: f32,
  pub y: f32,
  pub z: f32,
}

impl Vec3 {
  pub const fn new(x: f32, y: f32, z: f32) -> Self {
    Self { x, y, z }
  }

  pub fn from_landmark(p: &Landmark) -> Self {
    Self::new(p.x, p.y, p.depth())
  }

  pub fn sub(self, other: Vec3) -> Vec3 {
    Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
  }

  pub fn cross(self, other: Vec3) -> Vec3 {
    Vec3::new(
      self.y * other.z - self.z * other.y,
      self.z * other.x - self.x * other.z,
      self.x * other.y - self.y * other.x,
    )
  }

  pub fn norm(self) -> f32 {
    (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
  }
}

/// 归一化平面上的两点距离
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
  (a.x - b.x).hypot(a.y - b.y)
}

/// 由 (手腕→食指 MCP) × (手腕→小指 MCP) 得到掌心法向量
///
/// 在做叉积之前拒绝退化输入，而不是让结果悄悄变成零向量。
pub fn palm_normal(landmarks: &LandmarkSet) -> Result<Vec3, GeometryError> {
  let wrist = Vec3::from_landmark(landmarks.point(landmark::WRIST));
  let to_index = Vec3::from_landmark(landmarks.point(landmark::INDEX_MCP)).sub(wrist);
  let to_pinky = Vec3::from_landmark(landmarks.point(landmark::PINKY_MCP)).sub(wrist);

  if to_index.norm() < MIN_EDGE_LENGTH || to_pinky.norm() < MIN_EDGE_LENGTH {
    return Err(GeometryError::ZeroLengthEdge);
  }

  let normal = to_index.cross(to_pinky);
  if normal.norm() < MIN_NORMAL_LENGTH {
    return Err(GeometryError::Collinear);
  }

  Ok(normal)
}
