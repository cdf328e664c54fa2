// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/state.rs - 帧状态机与跨线程共享状态
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
  fmt,
  sync::{Arc, Mutex, MutexGuard},
};

use tracing::info;

use crate::{
  control::ServoPosition,
  output::{Face, Rgb},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameState {
  #[default]
  Idle,
  Tracking,
  Listening,
  LiveChat,
}

impl FrameState {
  pub fn as_str(&self) -> &'static str {
    match self {
      FrameState::Idle => "IDLE",
      FrameState::Tracking => "TRACKING",
      FrameState::Listening => "LISTENING",
      FrameState::LiveChat => "LIVE_CHAT",
    }
  }

  /// 该状态下是否运行手势识别
  pub fn runs_vision(&self) -> bool {
    !matches!(self, FrameState::Listening)
  }
}

impl fmt::Display for FrameState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
  LockAcquired,
  LockLost,
  /// 唤醒词或触摸，二者合并为同一触发
  Wake,
  SessionLaunched,
  SessionEnded,
}

pub type Transition = (FrameState, FrameState);

#[derive(Debug, Default)]
pub struct StateMachine {
  state: FrameState,
}

impl StateMachine {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> FrameState {
    self.state
  }

  /// 未列出的 (状态, 事件) 组合被忽略
  pub fn handle(&mut self, event: StateEvent) -> Option<Transition> {
    use FrameState::*;
    use StateEvent::*;

    let next = match (self.state, event) {
      (Idle, LockAcquired) => Tracking,
      (Tracking, LockLost) => Idle,
      (Idle | Tracking, Wake) => Listening,
      (Listening, SessionLaunched) => LiveChat,
      (Listening | LiveChat, SessionEnded) => Idle,
      _ => return None,
    };

    let from = self.state;
    self.state = next;
    info!("状态切换: {} -> {} ({:?})", from, next, event);
    Some((from, next))
  }
}

#[derive(Debug, Default)]
struct Flags {
  state: FrameState,
  wake_pending: bool,
  end_requested: bool,
}

/// 帧循环与其他线程（触摸、控制台、对话）之间的共享标志
///
/// 任何线程都可以置位，只有帧循环消费。
#[derive(Debug, Clone, Default)]
pub struct SharedFlags {
  inner: Arc<Mutex<Flags>>,
}

impl SharedFlags {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Flags> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn fire_wake(&self) {
    self.lock().wake_pending = true;
  }

  /// 取走自上次检查以来的唤醒事件
  pub fn take_wake(&self) -> bool {
    std::mem::take(&mut self.lock().wake_pending)
  }

  pub fn request_end(&self) {
    self.lock().end_requested = true;
  }

  pub fn take_end_request(&self) -> bool {
    std::mem::take(&mut self.lock().end_requested)
  }

  pub fn state(&self) -> FrameState {
    self.lock().state
  }

  pub fn set_state(&self, state: FrameState) {
    self.lock().state = state;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotSnapshot {
  pub face: Face,
  pub brightness: u8,
  pub color: Rgb,
  pub servo: (i32, i32),
}

impl Default for RobotSnapshot {
  fn default() -> Self {
    Self {
      face: Face::Sleep,
      brightness: 100,
      color: Rgb::WHITE,
      servo: (90, 90),
    }
  }
}

/// 台灯当前的表情、灯光和舵机角度；只由帧循环写入
#[derive(Debug, Clone, Default)]
pub struct SharedRobotState {
  inner: Arc<Mutex<RobotSnapshot>>,
}

impl SharedRobotState {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, RobotSnapshot> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn snapshot(&self) -> RobotSnapshot {
    *self.lock()
  }

  pub(crate) fn set_face(&self, face: Face) {
    self.lock().face = face;
  }

  pub(crate) fn set_brightness(&self, brightness: u8) {
    self.lock().brightness = brightness;
  }

  pub(crate) fn set_color(&self, color: Rgb) {
    self.lock().color = color;
  }

  pub(crate) fn set_servo(&self, position: ServoPosition) {
    self.lock().servo = position.rounded();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_cycle_visits_states_in_order() {
    let mut machine = StateMachine::new();
    let mut visited = vec![machine.state()];
    for event in [
      StateEvent::LockAcquired,
      StateEvent::Wake,
      StateEvent::SessionLaunched,
      StateEvent::SessionEnded,
    ] {
      let (from, to) = machine.handle(event).unwrap();
      assert_eq!(from, *visited.last().unwrap());
      visited.push(to);
    }
    assert_eq!(
      visited,
      [
        FrameState::Idle,
        FrameState::Tracking,
        FrameState::Listening,
        FrameState::LiveChat,
        FrameState::Idle
      ]
    );
  }

  #[test]
  fn unlisted_pairs_are_ignored() {
    let mut machine = StateMachine::new();
    assert_eq!(machine.handle(StateEvent::LockLost), None);
    assert_eq!(machine.handle(StateEvent::SessionLaunched), None);
    assert_eq!(machine.handle(StateEvent::SessionEnded), None);

    machine.handle(StateEvent::Wake);
    assert_eq!(machine.state(), FrameState::Listening);
    assert_eq!(machine.handle(StateEvent::LockAcquired), None);
    assert_eq!(machine.handle(StateEvent::Wake), None);

    machine.handle(StateEvent::SessionLaunched);
    assert_eq!(machine.handle(StateEvent::LockLost), None);
    assert_eq!(machine.handle(StateEvent::LockAcquired), None);
    assert_eq!(machine.state(), FrameState::LiveChat);
  }

  #[test]
  fn failed_launch_returns_to_idle() {
    let mut machine = StateMachine::new();
    machine.handle(StateEvent::Wake);
    assert_eq!(
      machine.handle(StateEvent::SessionEnded),
      Some((FrameState::Listening, FrameState::Idle))
    );
  }

  #[test]
  fn wake_flag_is_consumed_once() {
    let flags = SharedFlags::new();
    let remote = flags.clone();
    std::thread::spawn(move || remote.fire_wake()).join().unwrap();
    assert!(flags.take_wake());
    assert!(!flags.take_wake());

    flags.request_end();
    assert!(flags.take_end_request());
    assert!(!flags.take_end_request());
  }

  #[test]
  fn robot_state_is_shared() {
    let robot = SharedRobotState::new();
    let reader = robot.clone();
    robot.set_face(Face::Love);
    robot.set_servo(ServoPosition::new(100.4, 70.6));
    let snapshot = reader.snapshot();
    assert_eq!(snapshot.face, Face::Love);
    assert_eq!(snapshot.servo, (100, 71));
  }
}
