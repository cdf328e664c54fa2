// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/conversation/channel.rs - 基于通道的对话后端
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

use std::sync::{
  Arc, Mutex,
  mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
};

use tracing::debug;

use crate::conversation::{
  ConversationBackend, EndReason, POLL_INTERVAL, SessionContext, SessionError, SessionEvent,
  parse_reply,
};

pub const REPLY_QUEUE_DEPTH: usize = 5;

/// 从有界队列读取对话服务的文字回复
///
/// 克隆共享同一个队列，每次会话用一份克隆。
#[derive(Clone)]
pub struct ChannelBackend {
  replies: Arc<Mutex<Receiver<String>>>,
}

impl ChannelBackend {
  pub fn channel() -> (SyncSender<String>, ChannelBackend) {
    let (tx, rx) = mpsc::sync_channel(REPLY_QUEUE_DEPTH);
    (
      tx,
      ChannelBackend {
        replies: Arc::new(Mutex::new(rx)),
      },
    )
  }
}

impl ConversationBackend for ChannelBackend {
  fn run(&mut self, context: &SessionContext) -> Result<EndReason, SessionError> {
    let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());

    while context.is_running() {
      let text = match replies.recv_timeout(POLL_INTERVAL) {
        Ok(text) => text,
        Err(RecvTimeoutError::Timeout) => continue,
        Err(RecvTimeoutError::Disconnected) => {
          return Err(SessionError::Backend("回复通道已关闭".to_string()));
        }
      };
      debug!("收到回复: {}", text);

      let mut ended = None;
      context.emit(SessionEvent::TalkStarted)?;
      for event in parse_reply(&text) {
        match event {
          SessionEvent::Ended(reason) => ended = Some(reason),
          event => context.emit(event)?,
        }
      }
      context.emit(SessionEvent::TalkStopped)?;

      if let Some(reason) = ended {
        return Ok(reason);
      }
    }

    Ok(EndReason::User)
  }
}
