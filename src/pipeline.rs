// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/pipeline.rs - 单帧处理流程
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

use std::{fmt, time::Instant};

use tracing::{debug, info, warn};

use crate::{
  config::TrackerConfig,
  control::{PositionSmoother, ServoPosition, ServoTracker},
  conversation::{ConversationBackend, ConversationSession, SessionEvent},
  frame::{HandFrame, landmark},
  model::{GestureClassifier, GestureDecision, Model},
  output::{Actuator, Command, CommandLink, Face},
  state::{FrameState, SharedFlags, SharedRobotState, StateEvent, StateMachine, Transition},
};

/// 一帧处理后的结果，供记录与测试使用
#[derive(Debug, Clone)]
pub struct FrameReport {
  pub index: u64,
  /// 本帧处理结束时的状态
  pub state: FrameState,
  pub transitions: Vec<Transition>,
  /// LISTENING 状态与保活帧不运行识别，此时为 None
  pub decision: Option<GestureDecision>,
  /// 平滑后的锚点（像素）
  pub anchor: Option<(f32, f32)>,
  pub servo: ServoPosition,
  pub servo_sent: bool,
  pub events: Vec<SessionEvent>,
}

impl FrameReport {
  pub fn locked(&self) -> bool {
    self.decision.is_some_and(|d| d.locked)
  }
}

pub struct Pipeline<A, B> {
  classifier: GestureClassifier,
  smoother: PositionSmoother,
  tracker: ServoTracker,
  link: CommandLink<A>,
  machine: StateMachine,
  session: ConversationSession,
  backend: B,
  flags: SharedFlags,
  robot: SharedRobotState,
  pending_release: Option<ServoPosition>,
  was_locked: bool,
}

impl<A, B> Pipeline<A, B>
where
  A: Actuator,
  A::Error: fmt::Display,
  B: ConversationBackend + Clone,
{
  pub fn new(config: &TrackerConfig, actuator: A, backend: B) -> Self {
    Self {
      classifier: GestureClassifier::new(config.gesture.clone()),
      smoother: PositionSmoother::new(config.smoother),
      tracker: ServoTracker::new(config.servo.clone(), config.hand_loss),
      link: CommandLink::new(actuator, config.limiter.clone()),
      machine: StateMachine::new(),
      session: ConversationSession::new(),
      backend,
      flags: SharedFlags::new(),
      robot: SharedRobotState::new(),
      pending_release: None,
      was_locked: false,
    }
  }

  pub fn flags(&self) -> SharedFlags {
    self.flags.clone()
  }

  pub fn robot(&self) -> SharedRobotState {
    self.robot.clone()
  }

  pub fn state(&self) -> FrameState {
    self.machine.state()
  }

  pub fn servo(&self) -> ServoPosition {
    self.tracker.position()
  }

  pub fn link(&self) -> &CommandLink<A> {
    &self.link
  }

  pub fn classifier(&self) -> &GestureClassifier {
    &self.classifier
  }

  /// 与本体握手并使能舵机
  pub fn startup(&mut self) {
    self.link.send(Command::Ping);
    self.link.send(Command::ServoEnable);
    self.set_face(Face::Sleep);
  }

  pub fn shutdown(&mut self) {
    if self.machine.state() == FrameState::LiveChat {
      self.link.send(Command::ChatStop);
    }
    self.session.stop();
    self.session.cleanup();
    self.set_face(Face::Sleep);
  }

  fn set_face(&mut self, face: Face) {
    self.link.send(Command::Face(face));
    self.robot.set_face(face);
  }

  fn transition(&mut self, event: StateEvent, transitions: &mut Vec<Transition>) -> bool {
    match self.machine.handle(event) {
      Some(t) => {
        transitions.push(t);
        self.flags.set_state(t.1);
        true
      }
      None => false,
    }
  }

  fn poll_body(&mut self) {
    while let Some(status) = self.link.poll_status() {
      if status.is_wake() {
        info!("触摸唤醒");
        self.flags.fire_wake();
      } else if status.is_end_request() {
        info!("触摸结束对话");
        self.flags.request_end();
      } else {
        debug!("本体状态: {:?}", status);
      }
    }
  }

  /// 把会话事件转成台灯命令，返回会话是否已结束
  fn apply_events(&mut self, events: &[SessionEvent]) -> bool {
    let mut ended = false;
    for event in events {
      match event {
        SessionEvent::Emotion(face) => self.set_face(*face),
        SessionEvent::Brightness(level) => {
          self.link.send(Command::Brightness(*level));
          self.robot.set_brightness(*level);
        }
        SessionEvent::Color(rgb) => {
          self.link.send(Command::Color(*rgb));
          self.robot.set_color(*rgb);
        }
        SessionEvent::Text(text) => info!("Lumina: {}", text),
        SessionEvent::TalkStarted => {
          self.link.send(Command::TalkStart);
        }
        SessionEvent::TalkStopped => {
          self.link.send(Command::TalkStop);
        }
        SessionEvent::Ended(reason) => {
          info!("对话结束: {:?}", reason);
          ended = true;
        }
      }
    }
    ended
  }

  fn end_conversation(&mut self, transitions: &mut Vec<Transition>) {
    self.session.stop();
    self.session.cleanup();
    if self.transition(StateEvent::SessionEnded, transitions) {
      self.link.send(Command::ChatStop);
      self.set_face(Face::Sleep);
    }
  }

  fn launch_conversation(&mut self, transitions: &mut Vec<Transition>) {
    match self.session.start(self.backend.clone()) {
      Ok(()) => {
        self.transition(StateEvent::SessionLaunched, transitions);
        self.link.send(Command::ChatStart);
        self.set_face(Face::Listening);
      }
      Err(e) => {
        warn!("对话会话启动失败: {}", e);
        self.transition(StateEvent::SessionEnded, transitions);
        self.set_face(Face::Sleep);
      }
    }
  }

  fn lose_lock(&mut self) {
    self.smoother.reset();
    self.was_locked = false;
  }

  pub fn process_frame(&mut self, frame: &HandFrame, now: Instant) -> FrameReport {
    let mut transitions = Vec::new();
    let mut servo_sent = false;
    let mut anchor = None;

    self.poll_body();
    let wake = self.flags.take_wake() || frame.wake;
    let end_requested = self.flags.take_end_request();
    let mut events = self.session.drain_events();
    let session_ended = self.apply_events(&events);

    let state = self.machine.state();
    match state {
      FrameState::LiveChat if session_ended || end_requested || !self.session.is_running() => {
        // 会话线程先发事件再清除运行标志，这里补取剩余事件
        let late = self.session.drain_events();
        self.apply_events(&late);
        events.extend(late);
        self.end_conversation(&mut transitions);
        self.lose_lock();
      }
      FrameState::Listening => self.launch_conversation(&mut transitions),
      FrameState::Idle | FrameState::Tracking if wake => {
        self.transition(StateEvent::Wake, &mut transitions);
        self.lose_lock();
        self.pending_release = None;
      }
      _ => {}
    }

    // 保活帧没有检测结果，不能当作手势丢失
    let mut decision = None;
    let state = self.machine.state();
    let entered_chat = transitions.iter().any(|t| t.1 == FrameState::LiveChat);
    if state.runs_vision() && !entered_chat && !frame.tick {
      let result = match self.classifier.infer(frame) {
        Ok(result) => result,
        Err(e) => match e {},
      };

      match (&frame.hand, result.locked) {
        (Some(hand), true) => {
          let (raw_x, raw_y) =
            hand
              .landmarks
              .to_pixel(landmark::MIDDLE_MCP, frame.width, frame.height);
          let smoothed = self.smoother.smooth(raw_x, raw_y);
          anchor = Some(smoothed);
          self.was_locked = true;
          self.pending_release = None;

          if self.transition(StateEvent::LockAcquired, &mut transitions) {
            self.set_face(Face::Happy);
          }
          let position = self.tracker.track(smoothed, (frame.width, frame.height));
          servo_sent = self.link.maybe_send_at(now, position);
        }
        _ => {
          if self.was_locked {
            self.lose_lock();
          }
          if self.transition(StateEvent::LockLost, &mut transitions) {
            self.set_face(Face::Sleep);
            self.pending_release = self.tracker.release();
          }
        }
      }
      decision = Some(result);
    }

    if self.machine.state() != FrameState::Tracking {
      if let Some(home) = self.pending_release {
        if self.link.maybe_send_at(now, home) {
          self.pending_release = None;
          servo_sent = true;
        }
      }
    }
    if servo_sent {
      self.robot.set_servo(self.tracker.position());
    }

    debug!(
      "第 {} 帧: {} {}",
      frame.index,
      self.machine.state(),
      decision.map(|d| d.to_string()).unwrap_or_default()
    );

    FrameReport {
      index: frame.index,
      state: self.machine.state(),
      transitions,
      decision,
      anchor,
      servo: self.tracker.position(),
      servo_sent,
      events,
    }
  }
}
