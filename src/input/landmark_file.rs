// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/input/landmark_file.rs - JSON Lines 关键点回放
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

use std::{
  fs::File,
  io::{BufRead, BufReader, Lines},
  path::Path,
};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::HandFrame};

const DEFAULT_FPS: u64 = 30;

#[derive(Error, Debug)]
pub enum LandmarkFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("路径解码失败: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
  #[error("无效的帧率: {0}")]
  InvalidFps(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每行一个 `HandFrame` JSON 对象；格式错误的行记录日志后跳过
///
/// 缺少序号的行按出现顺序补齐；缺少时间戳的行取上一帧时间戳加一个帧间隔，
/// 回放时间不会倒退。
pub struct LandmarkFileInput {
  lines: Lines<BufReader<File>>,
  line_number: usize,
  position: u64,
  last_timestamp: Option<u64>,
  fps: u64,
}

impl FromUrlWithScheme for LandmarkFileInput {
  const SCHEME: &'static str = "landmarks";
}

impl FromUrl for LandmarkFileInput {
  type Error = LandmarkFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LandmarkFileInputError::SchemeMismatch);
    }

    let fps = match url.query_pairs().find(|(k, _)| k == "fps") {
      Some((_, v)) => match v.parse::<u64>() {
        Ok(fps) if fps > 0 => fps,
        _ => return Err(LandmarkFileInputError::InvalidFps(v.to_string())),
      },
      None => DEFAULT_FPS,
    };

    let path = urlencoding::decode(url.path())?;
    Ok(Self::open(&*path)?.with_fps(fps))
  }
}

impl LandmarkFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
    let path = path.as_ref();
    let file = File::open(path)?;
    info!("回放关键点文件 {}", path.display());
    Ok(Self {
      lines: BufReader::new(file).lines(),
      line_number: 0,
      position: 0,
      last_timestamp: None,
      fps: DEFAULT_FPS,
    })
  }

  pub fn with_fps(mut self, fps: u64) -> Self {
    self.fps = fps.max(1);
    self
  }
}

impl Iterator for LandmarkFileInput {
  type Item = HandFrame;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(line) => line,
        Err(e) => {
          error!("读取关键点文件失败: {}", e);
          return None;
        }
      };
      self.line_number += 1;

      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }

      match serde_json::from_str::<HandFrame>(line) {
        Ok(mut frame) => {
          if frame.index == 0 {
            frame.index = self.position;
          }
          if frame.timestamp_ms == 0 {
            frame.timestamp_ms = match self.last_timestamp {
              Some(last) => last + 1000 / self.fps,
              None => 0,
            };
          }
          self.last_timestamp = Some(frame.timestamp_ms);
          self.position += 1;
          return Some(frame);
        }
        Err(e) => warn!("第 {} 行格式错误，已跳过: {}", self.line_number, e),
      }
    }
  }
}
