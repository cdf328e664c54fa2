// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/model/fixtures.rs - 单元测试用的合成手部关键点
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

use crate::frame::{DetectedHand, Handedness, LANDMARK_COUNT, LandmarkSet, landmark::*};

/// 竖直张开、四指并拢的右手（镜像画面中掌心朝向摄像头）
pub(crate) fn open_palm() -> LandmarkSet {
  let mut p = [(0.0f32, 0.0f32); LANDMARK_COUNT];
  p[WRIST] = (0.50, 0.95);
  p[THUMB_CMC] = (0.46, 0.88);
  p[THUMB_MCP] = (0.43, 0.80);
  p[THUMB_IP] = (0.41, 0.72);
  p[THUMB_TIP] = (0.40, 0.66);
  for (i, finger) in FINGERS.iter().enumerate() {
    let x = 0.44 + 0.04 * i as f32;
    p[finger[0]] = (x, 0.60);
    p[finger[1]] = (x, 0.52);
    p[finger[2]] = (x, 0.46);
    p[finger[3]] = (x, 0.40);
  }
  LandmarkSet::from_xy(p)
}

/// 以手腕为基准纵向压缩，手型不变但外接框变矮
pub(crate) fn squashed(mut set: LandmarkSet, scale: f32) -> LandmarkSet {
  let wrist_y = set.point(WRIST).y;
  for p in set.points_mut().iter_mut() {
    p.y = wrist_y - scale * (wrist_y - p.y);
  }
  set
}

/// 中指 DIP 侧移，手指弯曲但指尖没有卷回手腕
pub(crate) fn bent_middle(mut set: LandmarkSet) -> LandmarkSet {
  set.points_mut()[MIDDLE_DIP].x += 0.06;
  set
}

/// 小指沿直线外展，指尖间距超过阈值
pub(crate) fn spread_pinky(mut set: LandmarkSet) -> LandmarkSet {
  let points = set.points_mut();
  points[PINKY_PIP].x = 0.58;
  points[PINKY_DIP].x = 0.595;
  points[PINKY_TIP].x = 0.61;
  set
}

/// 食指指尖卷回掌心
pub(crate) fn curled_index(mut set: LandmarkSet) -> LandmarkSet {
  let points = set.points_mut();
  points[INDEX_TIP].x = 0.44;
  points[INDEX_TIP].y = 0.70;
  set
}

pub(crate) fn hand(handedness: Handedness, landmarks: LandmarkSet) -> DetectedHand {
  DetectedHand {
    handedness,
    landmarks,
  }
}
