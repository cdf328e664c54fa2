// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/input.rs - 手部关键点输入
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

use crate::{FromUrl, frame::HandFrame};

#[cfg(feature = "landmark_file")]
mod landmark_file;
#[cfg(feature = "landmark_file")]
pub use self::landmark_file::{LandmarkFileInput, LandmarkFileInputError};

#[cfg(feature = "landmark_udp")]
mod landmark_udp;
#[cfg(feature = "landmark_udp")]
pub use self::landmark_udp::{LandmarkUdpInput, LandmarkUdpInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "landmark_file")]
  #[error("关键点文件输入错误: {0}")]
  LandmarkFileInputError(#[from] LandmarkFileInputError),
  #[cfg(feature = "landmark_udp")]
  #[error("关键点 UDP 输入错误: {0}")]
  LandmarkUdpInputError(#[from] LandmarkUdpInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 帧时间的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClock {
  /// 回放：使用帧内的时间戳
  Timestamp,
  /// 实时：使用本机时钟
  Wall,
}

pub enum InputWrapper {
  #[cfg(feature = "landmark_file")]
  LandmarkFile(LandmarkFileInput),
  #[cfg(feature = "landmark_udp")]
  LandmarkUdp(LandmarkUdpInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "landmark_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == LandmarkFileInput::SCHEME {
        let input = LandmarkFileInput::from_url(url)?;
        return Ok(InputWrapper::LandmarkFile(input));
      }
    }
    #[cfg(feature = "landmark_udp")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == LandmarkUdpInput::SCHEME {
        let input = LandmarkUdpInput::from_url(url)?;
        return Ok(InputWrapper::LandmarkUdp(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl InputWrapper {
  pub fn clock(&self) -> FrameClock {
    match self {
      #[cfg(feature = "landmark_file")]
      InputWrapper::LandmarkFile(_) => FrameClock::Timestamp,
      #[cfg(feature = "landmark_udp")]
      InputWrapper::LandmarkUdp(_) => FrameClock::Wall,
    }
  }
}

impl Iterator for InputWrapper {
  type Item = HandFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "landmark_file")]
      InputWrapper::LandmarkFile(input) => input.next(),
      #[cfg(feature = "landmark_udp")]
      InputWrapper::LandmarkUdp(input) => input.next(),
    }
  }
}
