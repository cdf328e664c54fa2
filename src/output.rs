// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 未配置输出时什么也不做
impl<Frame, Output, R: Render<Frame, Output>> Render<Frame, Output> for Option<R> {
  type Error = R::Error;

  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error> {
    match self {
      Some(render) => render.render_result(frame, result),
      None => Ok(()),
    }
  }
}

/// 台灯本体：接收文本命令，并可能上报状态
pub trait Actuator {
  type Error;
  fn send(&self, command: &Command) -> Result<(), Self::Error>;

  /// 非阻塞地读取一条本体状态
  fn poll_status(&self) -> Option<BodyStatus> {
    None
  }
}

impl<A: Actuator> Actuator for &A {
  type Error = A::Error;

  fn send(&self, command: &Command) -> Result<(), Self::Error> {
    (**self).send(command)
  }

  fn poll_status(&self) -> Option<BodyStatus> {
    (**self).poll_status()
  }
}

mod command;
pub use self::command::{Command, Face, MAX_BRIGHTNESS, Rgb};

mod status;
pub use self::status::{BodyStatus, UnknownStatus};

mod limiter;
pub use self::limiter::{CommandLink, CommandRateLimiter, DuplicatePolicy, LimiterConfig};

mod sim_actuator;
pub use self::sim_actuator::{SimActuator, SimHandle};

#[cfg(feature = "udp_actuator")]
mod udp_actuator;
#[cfg(feature = "udp_actuator")]
pub use self::udp_actuator::{UdpActuator, UdpActuatorError};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "udp_actuator")]
  #[error("UDP 执行器错误: {0}")]
  UdpActuatorError(#[from] UdpActuatorError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl From<Infallible> for OutputError {
  fn from(e: Infallible) -> Self {
    match e {}
  }
}

pub enum ActuatorWrapper {
  #[cfg(feature = "udp_actuator")]
  Udp(UdpActuator),
  Sim(SimActuator),
}

impl FromUrl for ActuatorWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "udp_actuator")]
      UdpActuator::SCHEME => Ok(ActuatorWrapper::Udp(UdpActuator::from_url(url)?)),
      SimActuator::SCHEME => Ok(ActuatorWrapper::Sim(SimActuator::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Actuator for ActuatorWrapper {
  type Error = OutputError;

  fn send(&self, command: &Command) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "udp_actuator")]
      ActuatorWrapper::Udp(actuator) => actuator.send(command).map_err(OutputError::from),
      ActuatorWrapper::Sim(actuator) => actuator.send(command).map_err(OutputError::from),
    }
  }

  fn poll_status(&self) -> Option<BodyStatus> {
    match self {
      #[cfg(feature = "udp_actuator")]
      ActuatorWrapper::Udp(actuator) => actuator.poll_status(),
      ActuatorWrapper::Sim(actuator) => actuator.poll_status(),
    }
  }
}
