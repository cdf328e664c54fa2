// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/sim_actuator.rs - 模拟执行器（无硬件时使用）
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
  collections::VecDeque,
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Actuator, BodyStatus, Command, OutputError},
};

/// 句柄长期不取走时只保留最近的命令
const JOURNAL_CAPACITY: usize = 1024;

#[derive(Default)]
struct Journal {
  sent: VecDeque<Command>,
  statuses: VecDeque<BodyStatus>,
}

impl Journal {
  fn record(&mut self, command: &Command) {
    if self.sent.len() == JOURNAL_CAPACITY {
      self.sent.pop_front();
    }
    self.sent.push_back(command.clone());
  }
}

/// 模拟执行器的观察句柄，可跨线程查看已发送命令、注入本体状态
#[derive(Clone, Default)]
pub struct SimHandle {
  journal: Arc<Mutex<Journal>>,
}

impl SimHandle {
  fn lock(&self) -> MutexGuard<'_, Journal> {
    self.journal.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn sent(&self) -> Vec<Command> {
    self.lock().sent.iter().cloned().collect()
  }

  pub fn take_sent(&self) -> Vec<Command> {
    self.lock().sent.drain(..).collect()
  }

  /// 模拟本体上报（如触摸）
  pub fn push_status(&self, status: BodyStatus) {
    self.lock().statuses.push_back(status);
  }
}

/// 只写日志的执行器；取过句柄之后才开始记录命令
#[derive(Default)]
pub struct SimActuator {
  handle: OnceLock<SimHandle>,
}

impl SimActuator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn handle(&self) -> SimHandle {
    self.handle.get_or_init(SimHandle::default).clone()
  }
}

impl FromUrlWithScheme for SimActuator {
  const SCHEME: &'static str = "sim";
}

impl FromUrl for SimActuator {
  type Error = OutputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    info!("使用模拟执行器，命令只写入日志");
    Ok(Self::new())
  }
}

impl Actuator for SimActuator {
  type Error = Infallible;

  fn send(&self, command: &Command) -> Result<(), Self::Error> {
    if command.is_servo() {
      debug!("[模拟] {}", command);
    } else {
      info!("[模拟] {}", command);
    }
    if let Some(handle) = self.handle.get() {
      handle.lock().record(command);
    }
    Ok(())
  }

  fn poll_status(&self) -> Option<BodyStatus> {
    self.handle.get()?.lock().statuses.pop_front()
  }
}
