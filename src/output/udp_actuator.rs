// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/udp_actuator.rs - UDP 数据报执行器
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
  net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Actuator, BodyStatus, Command},
};

const STATUS_BUFFER: usize = 256;

#[derive(Error, Debug)]
pub enum UdpActuatorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少目标主机")]
  MissingHost,
  #[error("缺少目标端口")]
  MissingPort,
  #[error("无法解析目标地址: {0}")]
  Unresolved(String),
  #[error("无效的本地端口: {0}")]
  InvalidBind(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 通过 UDP 向台灯本体发送文本命令；本地端口同时接收本体状态
pub struct UdpActuator {
  socket: UdpSocket,
  target: SocketAddr,
}

impl UdpActuator {
  pub fn connect(target: SocketAddr, bind_port: u16) -> Result<Self, UdpActuatorError> {
    let socket = UdpSocket::bind(("0.0.0.0", bind_port))?;
    socket.set_nonblocking(true)?;
    info!(
      "UDP 执行器就绪: 本地 {}, 目标 {}",
      socket.local_addr()?,
      target
    );
    Ok(Self { socket, target })
  }

  pub fn target(&self) -> SocketAddr {
    self.target
  }

  pub fn local_addr(&self) -> Result<SocketAddr, UdpActuatorError> {
    Ok(self.socket.local_addr()?)
  }
}

impl FromUrlWithScheme for UdpActuator {
  const SCHEME: &'static str = "udp";
}

impl FromUrl for UdpActuator {
  type Error = UdpActuatorError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(UdpActuatorError::SchemeMismatch);
    }

    let host = url.host_str().ok_or(UdpActuatorError::MissingHost)?;
    let port = url.port().ok_or(UdpActuatorError::MissingPort)?;
    let target = (host, port)
      .to_socket_addrs()?
      .next()
      .ok_or_else(|| UdpActuatorError::Unresolved(format!("{host}:{port}")))?;

    let bind_port = match url.query_pairs().find(|(k, _)| k == "bind") {
      Some((_, v)) => v
        .parse::<u16>()
        .map_err(|_| UdpActuatorError::InvalidBind(v.to_string()))?,
      None => 0,
    };

    Self::connect(target, bind_port)
  }
}

impl Actuator for UdpActuator {
  type Error = UdpActuatorError;

  fn send(&self, command: &Command) -> Result<(), Self::Error> {
    let text = command.to_string();
    self.socket.send_to(text.as_bytes(), self.target)?;
    Ok(())
  }

  fn poll_status(&self) -> Option<BodyStatus> {
    let mut buffer = [0u8; STATUS_BUFFER];
    match self.socket.recv_from(&mut buffer) {
      Ok((len, from)) => {
        let text = String::from_utf8_lossy(&buffer[..len]);
        match text.parse::<BodyStatus>() {
          Ok(status) => {
            debug!("收到本体状态 {:?} 来自 {}", status, from);
            Some(status)
          }
          Err(e) => {
            debug!("{}", e);
            None
          }
        }
      }
      Err(e) if e.kind() == ErrorKind::WouldBlock => None,
      Err(e) => {
        warn!("读取本体状态失败: {}", e);
        None
      }
    }
  }
}
