// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/input/landmark_udp.rs - UDP 数据报关键点输入
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
  io::ErrorKind,
  net::{SocketAddr, UdpSocket},
  time::Duration,
};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::HandFrame};

const DATAGRAM_BUFFER: usize = 16 * 1024;
const READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum LandmarkUdpInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少监听端口")]
  MissingPort,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每个数据报一个 `HandFrame` JSON 对象
///
/// 超时没有数据时产出一个保活帧，帧循环因此能及时响应中断；
/// 保活帧不代表手已离开画面。
pub struct LandmarkUdpInput {
  socket: UdpSocket,
  buffer: Vec<u8>,
  last: HandFrame,
}

impl FromUrlWithScheme for LandmarkUdpInput {
  const SCHEME: &'static str = "hands+udp";
}

impl FromUrl for LandmarkUdpInput {
  type Error = LandmarkUdpInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LandmarkUdpInputError::SchemeMismatch);
    }

    let host = url.host_str().unwrap_or("0.0.0.0");
    let port = url.port().ok_or(LandmarkUdpInputError::MissingPort)?;
    Self::bind((host, port))
  }
}

impl LandmarkUdpInput {
  pub fn bind(addr: impl std::net::ToSocketAddrs) -> Result<Self, LandmarkUdpInputError> {
    let socket = UdpSocket::bind(addr)?;
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    info!("等待关键点数据报: {}", socket.local_addr()?);
    Ok(Self {
      socket,
      buffer: vec![0; DATAGRAM_BUFFER],
      last: HandFrame::empty(0, 0),
    })
  }

  pub fn local_addr(&self) -> Result<SocketAddr, LandmarkUdpInputError> {
    Ok(self.socket.local_addr()?)
  }

  fn tick_frame(&mut self) -> HandFrame {
    self.last = HandFrame::tick(self.last.index + 1, self.last.timestamp_ms)
      .with_size(self.last.width, self.last.height);
    self.last.clone()
  }
}

impl Iterator for LandmarkUdpInput {
  type Item = HandFrame;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      match self.socket.recv_from(&mut self.buffer) {
        Ok((len, from)) => match serde_json::from_slice::<HandFrame>(&self.buffer[..len]) {
          Ok(frame) => {
            self.last = frame.clone();
            return Some(frame);
          }
          Err(e) => warn!("来自 {} 的数据报格式错误，已跳过: {}", from, e),
        },
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
          return Some(self.tick_frame());
        }
        Err(e) => {
          error!("接收关键点数据报失败: {}", e);
          return None;
        }
      }
    }
  }
}
