// 该文件是 Lumina （流明台灯） 项目的一部分。
// tests/pipeline_scenarios.rs - 帧循环端到端场景
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

mod common;

use std::{
  cell::RefCell,
  convert::Infallible,
  net::UdpSocket,
  rc::Rc,
  thread,
  time::{Duration, Instant},
};

use common::*;
use lumina::{
  config::TrackerConfig,
  control::{HandLossPolicy, ServoPosition},
  conversation::{
    ConversationBackend, EndReason, SessionContext, SessionError, SessionEvent,
  },
  frame::HandFrame,
  input::{FrameClock, LandmarkUdpInput},
  model::{GestureClassifier, LockStatus, Model},
  output::{BodyStatus, Command, Face, Render, SimActuator, SimHandle},
  pipeline::{FrameReport, Pipeline},
  state::FrameState,
  task::{Task, TrackingTask},
};

fn pipeline_with(
  config: TrackerConfig,
  backend: ScriptedBackend,
) -> (Pipeline<SimActuator, ScriptedBackend>, SimHandle) {
  let actuator = SimActuator::new();
  let sim = actuator.handle();
  let mut pipeline = Pipeline::new(&config, actuator, backend);
  pipeline.startup();
  sim.take_sent();
  (pipeline, sim)
}

fn servo_commands(commands: &[Command]) -> Vec<Command> {
  commands.iter().filter(|c| c.is_servo()).cloned().collect()
}

#[test]
fn fist_opening_locks_once_fingers_are_straight() {
  let classifier = GestureClassifier::default();
  let threshold = classifier.config().openness_threshold;

  let decisions: Vec<_> = fist_opening(10)
    .into_iter()
    .enumerate()
    .map(|(i, landmarks)| {
      let decision = classifier.infer(&frame(i as u64, Some(landmarks))).unwrap();
      let straightness = decision.features.unwrap().straightness;
      (decision, straightness)
    })
    .collect();

  let (first, _) = decisions[0];
  assert_eq!(first.status, LockStatus::FingersCurled);
  assert!(decisions.last().unwrap().0.locked);

  for pair in decisions.windows(2) {
    assert!(pair[1].1 >= pair[0].1 - 1e-6, "张开过程中伸直度不应下降");
  }
  for (decision, straightness) in &decisions {
    assert_eq!(decision.locked, *straightness > threshold);
  }

  let first_lock = decisions.iter().position(|(d, _)| d.locked);
  let first_straight = decisions.iter().position(|(_, s)| *s > threshold);
  assert_eq!(first_lock, first_straight);
  assert!(first_lock.unwrap() > 0);
}

#[test]
fn walks_through_all_states() {
  let (mut pipeline, sim) = pipeline_with(TrackerConfig::default(), ScriptedBackend::waiting());
  let start = Instant::now();

  let r1 = pipeline.process_frame(&frame(1, None), at(start, 1));
  assert_eq!(r1.state, FrameState::Idle);
  assert_eq!(r1.decision.unwrap().status, LockStatus::Idle);
  assert!(sim.take_sent().is_empty());

  let r2 = pipeline.process_frame(&frame(2, Some(open_palm())), at(start, 2));
  assert_eq!(r2.transitions, vec![(FrameState::Idle, FrameState::Tracking)]);
  assert!(r2.servo_sent);
  assert_eq!(
    sim.take_sent(),
    vec![
      Command::Face(Face::Happy),
      Command::ServoPan(90),
      Command::ServoTilt(92),
    ]
  );

  let r3 = pipeline.process_frame(
    &frame(3, Some(open_palm())).with_wake(true),
    at(start, 3),
  );
  assert_eq!(r3.transitions, vec![(FrameState::Tracking, FrameState::Listening)]);
  assert!(r3.decision.is_none());
  assert!(sim.take_sent().is_empty());

  let r4 = pipeline.process_frame(&frame(4, Some(open_palm())), at(start, 4));
  assert_eq!(r4.transitions, vec![(FrameState::Listening, FrameState::LiveChat)]);
  assert!(r4.decision.is_none(), "进入对话的这一帧不做识别");
  assert_eq!(
    sim.take_sent(),
    vec![Command::ChatStart, Command::Face(Face::Listening)]
  );

  let r5 = pipeline.process_frame(&frame(5, Some(open_palm())), at(start, 5));
  assert_eq!(r5.state, FrameState::LiveChat);
  assert!(r5.locked());
  assert!(r5.servo_sent);
  assert_eq!(
    sim.take_sent(),
    vec![Command::ServoPan(90), Command::ServoTilt(95)]
  );

  pipeline.flags().request_end();
  let r6 = pipeline.process_frame(&frame(6, None), at(start, 6));
  assert_eq!(r6.transitions, vec![(FrameState::LiveChat, FrameState::Idle)]);
  assert_eq!(
    sim.take_sent(),
    vec![Command::ChatStop, Command::Face(Face::Sleep)]
  );
  assert_eq!(pipeline.flags().state(), FrameState::Idle);
  assert_eq!(pipeline.robot().snapshot().face, Face::Sleep);
  assert_eq!(pipeline.robot().snapshot().servo, (90, 95));
}

fn lose_hand(policy: HandLossPolicy) -> (FrameReport, Vec<Command>, ServoPosition) {
  let config = TrackerConfig {
    hand_loss: policy,
    ..TrackerConfig::default()
  };
  let (mut pipeline, sim) = pipeline_with(config, ScriptedBackend::waiting());
  let start = Instant::now();

  pipeline.process_frame(&frame(1, Some(open_palm())), at(start, 1));
  sim.take_sent();
  let report = pipeline.process_frame(&frame(2, None), at(start, 2));
  (report, sim.take_sent(), pipeline.servo())
}

#[test]
fn hold_keeps_last_servo_position() {
  let (report, sent, servo) = lose_hand(HandLossPolicy::Hold);
  assert_eq!(report.transitions, vec![(FrameState::Tracking, FrameState::Idle)]);
  assert!(!report.servo_sent);
  assert_eq!(sent, vec![Command::Face(Face::Sleep)]);
  assert_eq!(servo.rounded(), (90, 92));
}

#[test]
fn reset_to_home_sends_home_position() {
  let (report, sent, servo) = lose_hand(HandLossPolicy::ResetToHome);
  assert!(report.servo_sent);
  assert_eq!(
    sent,
    vec![
      Command::Face(Face::Sleep),
      Command::ServoPan(90),
      Command::ServoTilt(90),
    ]
  );
  assert_eq!(servo.rounded(), (90, 90));
}

#[test]
fn rate_limited_release_is_retried() {
  let config = TrackerConfig {
    hand_loss: HandLossPolicy::ResetToHome,
    ..TrackerConfig::default()
  };
  let (mut pipeline, sim) = pipeline_with(config, ScriptedBackend::waiting());
  let start = Instant::now();

  pipeline.process_frame(&frame(1, Some(open_palm())), start);
  sim.take_sent();

  let early = pipeline.process_frame(&frame(2, None), start + Duration::from_millis(5));
  assert!(!early.servo_sent);
  assert_eq!(sim.take_sent(), vec![Command::Face(Face::Sleep)]);

  let retry = pipeline.process_frame(&frame(3, None), start + Duration::from_millis(40));
  assert!(retry.servo_sent);
  assert_eq!(
    servo_commands(&sim.take_sent()),
    vec![Command::ServoPan(90), Command::ServoTilt(90)]
  );

  let after = pipeline.process_frame(&frame(4, None), start + Duration::from_millis(80));
  assert!(!after.servo_sent);
  assert!(sim.take_sent().is_empty());
}

#[test]
fn silent_feed_does_not_release_the_lock() {
  let config = TrackerConfig {
    hand_loss: HandLossPolicy::ResetToHome,
    ..TrackerConfig::default()
  };
  let (mut pipeline, sim) = pipeline_with(config, ScriptedBackend::waiting());
  let mut input = LandmarkUdpInput::bind("127.0.0.1:0").unwrap();
  let target = input.local_addr().unwrap();
  let detector = UdpSocket::bind("127.0.0.1:0").unwrap();
  let send = |frame: &HandFrame| {
    let json = serde_json::to_string(frame).unwrap();
    detector.send_to(json.as_bytes(), target).unwrap();
  };
  let start = Instant::now();

  send(&frame(1, Some(open_palm())));
  let locked = pipeline.process_frame(&input.next().unwrap(), at(start, 1));
  assert_eq!(locked.state, FrameState::Tracking);
  sim.take_sent();

  thread::sleep(Duration::from_millis(150));
  let silent = input.next().unwrap();
  assert!(silent.tick);
  let report = pipeline.process_frame(&silent, at(start, 2));
  assert_eq!(report.state, FrameState::Tracking);
  assert!(report.transitions.is_empty());
  assert!(report.decision.is_none());
  assert!(!report.servo_sent);
  assert!(sim.take_sent().is_empty());
  assert_eq!(pipeline.servo().rounded(), (90, 92));

  send(&frame(3, None));
  let lost = pipeline.process_frame(&input.next().unwrap(), at(start, 3));
  assert_eq!(lost.transitions, vec![(FrameState::Tracking, FrameState::Idle)]);
  assert!(lost.servo_sent);
}

#[test]
fn keepalive_frames_still_take_wake_requests() {
  let (mut pipeline, _sim) = pipeline_with(TrackerConfig::default(), ScriptedBackend::waiting());
  let start = Instant::now();

  pipeline.process_frame(&frame(1, Some(open_palm())), at(start, 1));
  pipeline.flags().fire_wake();
  let report = pipeline.process_frame(&HandFrame::tick(2, 66), at(start, 2));
  assert_eq!(report.transitions, vec![(FrameState::Tracking, FrameState::Listening)]);
}

#[test]
fn live_chat_only_moves_servo_while_locked() {
  let (mut pipeline, sim) = pipeline_with(TrackerConfig::default(), ScriptedBackend::waiting());
  let start = Instant::now();

  pipeline.flags().fire_wake();
  pipeline.process_frame(&frame(1, None), at(start, 1));
  pipeline.process_frame(&frame(2, None), at(start, 2));
  assert_eq!(pipeline.state(), FrameState::LiveChat);
  sim.take_sent();

  let curled = pipeline.process_frame(&frame(3, Some(fist())), at(start, 3));
  assert_eq!(curled.state, FrameState::LiveChat);
  assert!(!curled.locked());
  assert!(!curled.servo_sent);
  assert!(curled.transitions.is_empty());
  assert!(sim.take_sent().is_empty());

  let locked = pipeline.process_frame(&frame(4, Some(open_palm())), at(start, 4));
  assert_eq!(locked.state, FrameState::LiveChat);
  assert!(locked.servo_sent);
  assert!(locked.transitions.is_empty(), "对话中锁定不切换状态");
  assert_eq!(servo_commands(&sim.take_sent()).len(), 2);
}

#[test]
fn touch_starts_and_ends_conversation() {
  let (mut pipeline, sim) = pipeline_with(TrackerConfig::default(), ScriptedBackend::waiting());
  let start = Instant::now();

  sim.push_status(BodyStatus::Heartbeat { chat_mode: false });
  sim.push_status(BodyStatus::TouchListening);
  let woke = pipeline.process_frame(&frame(1, None), at(start, 1));
  assert_eq!(woke.transitions, vec![(FrameState::Idle, FrameState::Listening)]);

  let chat = pipeline.process_frame(&frame(2, None), at(start, 2));
  assert_eq!(chat.state, FrameState::LiveChat);

  sim.push_status(BodyStatus::TouchMute);
  let ended = pipeline.process_frame(&frame(3, None), at(start, 3));
  assert_eq!(ended.transitions, vec![(FrameState::LiveChat, FrameState::Idle)]);
  assert!(sim.sent().ends_with(&[Command::ChatStop, Command::Face(Face::Sleep)]));
}

#[test]
fn remote_end_applies_events_and_returns_to_idle() {
  let backend = ScriptedBackend::ending(
    vec![
      SessionEvent::TalkStarted,
      SessionEvent::Emotion(Face::Love),
      SessionEvent::Brightness(40),
      SessionEvent::TalkStopped,
    ],
    EndReason::Remote,
  );
  let (mut pipeline, sim) = pipeline_with(TrackerConfig::default(), backend);
  let start = Instant::now();

  pipeline.flags().fire_wake();
  pipeline.process_frame(&frame(1, None), at(start, 1));
  pipeline.process_frame(&frame(2, None), at(start, 2));
  assert_eq!(pipeline.state(), FrameState::LiveChat);

  let deadline = Instant::now() + Duration::from_secs(5);
  let mut events = Vec::new();
  let mut index = 3;
  while pipeline.state() != FrameState::Idle && Instant::now() < deadline {
    let report = pipeline.process_frame(&frame(index, None), at(start, index));
    events.extend(report.events);
    index += 1;
    thread::sleep(Duration::from_millis(5));
  }

  assert_eq!(pipeline.state(), FrameState::Idle);
  assert_eq!(events.last(), Some(&SessionEvent::Ended(EndReason::Remote)));

  let sent = sim.sent();
  for expected in [
    Command::TalkStart,
    Command::Face(Face::Love),
    Command::Brightness(40),
    Command::TalkStop,
    Command::ChatStop,
  ] {
    assert!(sent.contains(&expected), "缺少命令 {}", expected);
  }

  let snapshot = pipeline.robot().snapshot();
  assert_eq!(snapshot.face, Face::Sleep);
  assert_eq!(snapshot.brightness, 40);
}

#[derive(Clone)]
struct FailingBackend;

impl ConversationBackend for FailingBackend {
  fn run(&mut self, _context: &SessionContext) -> Result<EndReason, SessionError> {
    Err(SessionError::Backend("鉴权失败".to_string()))
  }
}

#[test]
fn session_error_returns_to_idle() {
  let actuator = SimActuator::new();
  let sim = actuator.handle();
  let mut pipeline = Pipeline::new(&TrackerConfig::default(), actuator, FailingBackend);
  let start = Instant::now();

  pipeline.flags().fire_wake();
  pipeline.process_frame(&frame(1, None), at(start, 1));
  pipeline.process_frame(&frame(2, None), at(start, 2));

  let deadline = Instant::now() + Duration::from_secs(5);
  let mut index = 3;
  let mut reasons = Vec::new();
  while pipeline.state() != FrameState::Idle && Instant::now() < deadline {
    let report = pipeline.process_frame(&frame(index, None), at(start, index));
    reasons.extend(report.events.into_iter().filter_map(|e| match e {
      SessionEvent::Ended(reason) => Some(reason),
      _ => None,
    }));
    index += 1;
    thread::sleep(Duration::from_millis(5));
  }

  assert_eq!(pipeline.state(), FrameState::Idle);
  assert!(matches!(reasons.as_slice(), [EndReason::Error(_)]));
  assert!(sim.sent().ends_with(&[Command::ChatStop, Command::Face(Face::Sleep)]));
}

#[derive(Clone, Default)]
struct CollectReports(Rc<RefCell<Vec<FrameReport>>>);

impl Render<HandFrame, FrameReport> for CollectReports {
  type Error = Infallible;

  fn render_result(&self, _frame: &HandFrame, report: &FrameReport) -> Result<(), Self::Error> {
    self.0.borrow_mut().push(report.clone());
    Ok(())
  }
}

#[test]
fn tracking_task_replays_frames() {
  let actuator = SimActuator::new();
  let sim = actuator.handle();
  let mut pipeline = Pipeline::new(
    &TrackerConfig::default(),
    actuator,
    ScriptedBackend::waiting(),
  );

  let frames = vec![
    frame(0, None),
    frame(1, Some(open_palm())),
    frame(2, Some(open_palm())),
    frame(3, None),
    frame(4, Some(open_palm())),
  ];
  let collected = CollectReports::default();

  TrackingTask::default()
    .with_clock(FrameClock::Timestamp)
    .with_frame_number(Some(4))
    .run_task(frames.into_iter(), &mut pipeline, collected.clone())
    .unwrap();

  let states: Vec<_> = collected.0.borrow().iter().map(|r| r.state).collect();
  assert_eq!(
    states,
    vec![
      FrameState::Idle,
      FrameState::Tracking,
      FrameState::Tracking,
      FrameState::Idle,
    ]
  );

  let sent = sim.sent();
  assert_eq!(&sent[..2], &[Command::Ping, Command::ServoEnable]);
  assert_eq!(sent.last(), Some(&Command::Face(Face::Sleep)));
}
