// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Datelike, Utc};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
  },
  rect::Rect,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{HandFrame, LANDMARK_COUNT, landmark},
  output::Render,
  pipeline::FrameReport,
};

const BACKGROUND: [u8; 3] = [24, 24, 24];
const LOCKED_COLOR: [u8; 3] = [0, 255, 0];
const UNLOCKED_COLOR: [u8; 3] = [255, 0, 0];
const POINT_COLOR: [u8; 3] = [255, 255, 255];
const BONE_COLOR: [u8; 3] = [120, 120, 120];
const DEADZONE_COLOR: [u8; 3] = [90, 90, 160];
const ANCHOR_COLOR: [u8; 3] = [255, 220, 0];
const DEFAULT_DEADZONE: f32 = 40.0;

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("路径解码失败: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 逐帧保存调试画面与文本记录，按日期分目录
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
  always: bool,
  deadzone: f32,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let path = urlencoding::decode(uri.path())?;

    Ok(Self::new(PathBuf::from(path.into_owned()), always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: PathBuf, always: bool) -> Self {
    Self {
      directory,
      frame_counter: Mutex::new(0),
      always,
      deadzone: DEFAULT_DEADZONE,
    }
  }

  /// 画面中死区圆的半径（像素）
  pub fn with_deadzone(mut self, deadzone: f32) -> Self {
    self.deadzone = deadzone;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counter.lock().unwrap_or_else(|e| e.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self, frame: &HandFrame) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:06}-{:04X}.png",
      now.format("%H-%M-%S"),
      frame.index,
      self.frame_id()
    )))
  }

  pub fn draw(&self, frame: &HandFrame, report: &FrameReport) -> RgbImage {
    let mut image = RgbImage::from_pixel(frame.width.max(1), frame.height.max(1), Rgb(BACKGROUND));
    let (cx, cy) = frame.center();

    draw_hollow_circle_mut(
      &mut image,
      (cx as i32, cy as i32),
      self.deadzone as i32,
      Rgb(DEADZONE_COLOR),
    );

    if let Some(hand) = &frame.hand {
      let pixel = |i: usize| hand.landmarks.to_pixel(i, frame.width, frame.height);
      for chain in landmark::FINGERS {
        let mut from = pixel(landmark::WRIST);
        for i in chain {
          let to = pixel(i);
          draw_line_segment_mut(&mut image, from, to, Rgb(BONE_COLOR));
          from = to;
        }
      }
      for i in 0..LANDMARK_COUNT {
        let (x, y) = pixel(i);
        draw_filled_circle_mut(&mut image, (x as i32, y as i32), 3, Rgb(POINT_COLOR));
      }
    }

    if let Some(decision) = &report.decision {
      let bbox = decision.bbox;
      if bbox.width() > 0 && bbox.height() > 0 {
        let color = if decision.locked {
          LOCKED_COLOR
        } else {
          UNLOCKED_COLOR
        };
        let rect = Rect::at(bbox.x_min, bbox.y_min).of_size(bbox.width() as u32, bbox.height() as u32);
        draw_hollow_rect_mut(&mut image, rect, Rgb(color));
      }
    }

    if let Some((ax, ay)) = report.anchor {
      draw_line_segment_mut(&mut image, (cx, cy), (ax, ay), Rgb(ANCHOR_COLOR));
      draw_filled_circle_mut(&mut image, (ax as i32, ay as i32), 5, Rgb(ANCHOR_COLOR));
    }

    image
  }

  pub fn describe(frame: &HandFrame, report: &FrameReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "frame: {}", frame.index);
    let _ = writeln!(text, "timestamp_ms: {}", frame.timestamp_ms);
    let _ = writeln!(text, "state: {}", report.state);
    match &report.decision {
      Some(decision) => {
        let _ = writeln!(text, "status: {}", decision);
        if let Some(features) = decision.features {
          let _ = writeln!(text, "straightness: {:.3}", features.straightness);
          let _ = writeln!(text, "together: {}", features.fingers_together);
          let _ = writeln!(
            text,
            "palm: {} ({:?})",
            features.palm.facing_camera, features.palm.source
          );
        }
      }
      None => {
        let _ = writeln!(text, "status: -");
      }
    }
    let _ = writeln!(text, "servo: {} sent: {}", report.servo, report.servo_sent);
    text
  }
}

impl Render<HandFrame, FrameReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &HandFrame, report: &FrameReport) -> Result<(), Self::Error> {
    if !self.always && frame.hand.is_none() {
      return Ok(());
    }

    let path = self.frame_path(frame)?;
    self.draw(frame, report).save(&path)?;
    std::fs::write(path.with_extension("txt"), Self::describe(frame, report))?;
    Ok(())
  }
}
