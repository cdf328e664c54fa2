// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/conversation.rs - 语音对话会话边界
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
    mpsc::SyncSender,
  },
  time::Duration,
};

use thiserror::Error;

use crate::output::{Face, Rgb};

/// 后端读取外部数据时的最长阻塞时间，保证能及时发现取消
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
  /// 远端服务发出结束
  Remote,
  /// 用户主动结束（按键、触摸）
  User,
  Error(String),
}

/// 对话会话发往帧循环的事件；由帧循环统一转成台灯命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
  Emotion(Face),
  Brightness(u8),
  Color(Rgb),
  Text(String),
  TalkStarted,
  TalkStopped,
  Ended(EndReason),
}

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("对话后端错误: {0}")]
  Backend(String),
  #[error("对话线程启动失败: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("对话事件通道已关闭")]
  Disconnected,
  #[error("对话会话已在运行")]
  AlreadyRunning,
}

/// 交给后端的运行上下文
pub struct SessionContext {
  running: Arc<AtomicBool>,
  events: SyncSender<SessionEvent>,
}

impl SessionContext {
  pub(crate) fn new(running: Arc<AtomicBool>, events: SyncSender<SessionEvent>) -> Self {
    Self { running, events }
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  /// 队列满时阻塞，由消费者施加背压
  pub fn emit(&self, event: SessionEvent) -> Result<(), SessionError> {
    self
      .events
      .send(event)
      .map_err(|_| SessionError::Disconnected)
  }
}

/// 外部对话服务：在独立线程中运行，直到结束或 `is_running` 变为 false
pub trait ConversationBackend: Send + 'static {
  fn run(&mut self, context: &SessionContext) -> Result<EndReason, SessionError>;
}

mod channel;
mod reply;
mod session;

pub use self::channel::{ChannelBackend, REPLY_QUEUE_DEPTH};
pub use self::reply::parse_reply;
pub use self::session::{ConversationSession, EVENT_QUEUE_DEPTH};
