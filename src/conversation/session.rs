// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/conversation/session.rs - 对话会话线程
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver},
  },
  thread::{self, JoinHandle},
};

use tracing::{error, info, warn};

use crate::conversation::{
  ConversationBackend, EndReason, SessionContext, SessionError, SessionEvent,
};

pub const EVENT_QUEUE_DEPTH: usize = 16;

/// 对话会话句柄，由帧循环在状态切换时调用
///
/// `stop` 只是请求，线程可能仍在收尾；`cleanup` 可重复调用，
/// 只回收已经结束的线程。
#[derive(Default)]
pub struct ConversationSession {
  running: Arc<AtomicBool>,
  events: Option<Receiver<SessionEvent>>,
  handle: Option<JoinHandle<()>>,
  lingering: Vec<JoinHandle<()>>,
}

impl ConversationSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn start<B: ConversationBackend>(&mut self, mut backend: B) -> Result<(), SessionError> {
    if self.is_running() {
      return Err(SessionError::AlreadyRunning);
    }
    self.cleanup();
    if let Some(handle) = self.handle.take() {
      self.lingering.push(handle);
    }

    // 每个会话使用独立的运行标志，避免唤醒仍在收尾的旧线程
    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
    let context = SessionContext::new(running.clone(), tx);

    let handle = thread::Builder::new()
      .name("lumina-conversation".to_string())
      .spawn(move || {
        info!("对话会话开始");
        let reason = match backend.run(&context) {
          Ok(reason) => reason,
          Err(e) => {
            error!("对话会话出错: {}", e);
            EndReason::Error(e.to_string())
          }
        };
        info!("对话会话结束: {:?}", reason);
        let _ = context.emit(SessionEvent::Ended(reason));
        context.running.store(false, Ordering::Release);
      });

    let handle = match handle {
      Ok(handle) => handle,
      Err(e) => {
        running.store(false, Ordering::Release);
        return Err(SessionError::Spawn(e));
      }
    };

    self.running = running;
    self.events = Some(rx);
    self.handle = Some(handle);
    Ok(())
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  pub fn stop(&self) {
    if self.running.swap(false, Ordering::AcqRel) {
      info!("请求结束对话会话");
    }
  }

  pub fn cleanup(&mut self) {
    self.stop();

    if self.handle.as_ref().is_some_and(|h| h.is_finished()) {
      if let Some(handle) = self.handle.take() {
        Self::join(handle);
      }
    }

    let (finished, pending): (Vec<_>, Vec<_>) =
      self.lingering.drain(..).partition(|h| h.is_finished());
    finished.into_iter().for_each(Self::join);
    self.lingering = pending;
  }

  fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
      warn!("对话线程异常退出");
    }
  }

  /// 是否还有未回收的线程
  pub fn has_threads(&self) -> bool {
    self.handle.is_some() || !self.lingering.is_empty()
  }

  /// 非阻塞地取出所有已到达的事件
  pub fn drain_events(&self) -> Vec<SessionEvent> {
    match &self.events {
      Some(rx) => rx.try_iter().collect(),
      None => Vec::new(),
    }
  }
}

impl Drop for ConversationSession {
  fn drop(&mut self) {
    self.stop();
  }
}
