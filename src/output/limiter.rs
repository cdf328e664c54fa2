// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/output/limiter.rs - 舵机命令限速与去重
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
  str::FromStr,
  time::{Duration, Instant},
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
  control::ServoPosition,
  output::{Actuator, BodyStatus, Command},
};

/// 重复命令的判定粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
  /// 两轴都与上次相同才抑制，发送时两轴一起发
  #[default]
  WholePair,
  /// 两轴分别比较，只发送变化的轴
  PerAxis,
}

impl FromStr for DuplicatePolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pair" | "whole_pair" => Ok(DuplicatePolicy::WholePair),
      "axis" | "per_axis" => Ok(DuplicatePolicy::PerAxis),
      other => Err(format!("未知的去重策略: {other}")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
  /// 两次舵机命令的最小间隔（毫秒）
  pub move_interval_ms: u64,
  pub duplicate_policy: DuplicatePolicy,
}

impl Default for LimiterConfig {
  fn default() -> Self {
    Self {
      move_interval_ms: 20,
      duplicate_policy: DuplicatePolicy::default(),
    }
  }
}

impl LimiterConfig {
  pub fn move_interval(&self) -> Duration {
    Duration::from_millis(self.move_interval_ms)
  }
}

/// 记录最后一次成功下发的角度与时间
#[derive(Debug, Clone, Default)]
pub struct CommandRateLimiter {
  config: LimiterConfig,
  last_sent: Option<(i32, i32)>,
  last_sent_at: Option<Instant>,
}

impl CommandRateLimiter {
  pub fn new(config: LimiterConfig) -> Self {
    Self {
      config,
      last_sent: None,
      last_sent_at: None,
    }
  }

  pub fn last_sent(&self) -> Option<(i32, i32)> {
    self.last_sent
  }

  /// 本次应当发出的命令，空表示抑制
  pub fn plan(&self, now: Instant, target: (i32, i32)) -> Vec<Command> {
    if let Some(at) = self.last_sent_at {
      if now.saturating_duration_since(at) < self.config.move_interval() {
        return Vec::new();
      }
    }

    let (pan, tilt) = target;
    match (self.config.duplicate_policy, self.last_sent) {
      (_, None) => vec![Command::ServoPan(pan), Command::ServoTilt(tilt)],
      (DuplicatePolicy::WholePair, Some(last)) if last == target => Vec::new(),
      (DuplicatePolicy::WholePair, Some(_)) => {
        vec![Command::ServoPan(pan), Command::ServoTilt(tilt)]
      }
      (DuplicatePolicy::PerAxis, Some((last_pan, last_tilt))) => {
        let mut commands = Vec::with_capacity(2);
        if pan != last_pan {
          commands.push(Command::ServoPan(pan));
        }
        if tilt != last_tilt {
          commands.push(Command::ServoTilt(tilt));
        }
        commands
      }
    }
  }

  pub fn commit(&mut self, now: Instant, target: (i32, i32)) {
    self.last_sent = Some(target);
    self.last_sent_at = Some(now);
  }
}

/// 执行器边界：舵机命令经过限速，其余命令直接透传
pub struct CommandLink<A> {
  actuator: A,
  limiter: CommandRateLimiter,
}

impl<A> CommandLink<A>
where
  A: Actuator,
  A::Error: fmt::Display,
{
  pub fn new(actuator: A, config: LimiterConfig) -> Self {
    Self {
      actuator,
      limiter: CommandRateLimiter::new(config),
    }
  }

  pub fn actuator(&self) -> &A {
    &self.actuator
  }

  pub fn limiter(&self) -> &CommandRateLimiter {
    &self.limiter
  }

  /// 发送失败只记录日志，不推进限速状态，下一帧会重试
  pub fn maybe_send_at(&mut self, now: Instant, position: ServoPosition) -> bool {
    let target = position.rounded();
    let commands = self.limiter.plan(now, target);
    if commands.is_empty() {
      return false;
    }

    for command in &commands {
      if let Err(e) = self.actuator.send(command) {
        warn!("舵机命令 {} 发送失败: {}", command, e);
        return false;
      }
    }
    debug!("舵机命令已发送: {:?}", commands);
    self.limiter.commit(now, target);
    true
  }

  pub fn send(&self, command: Command) -> bool {
    match self.actuator.send(&command) {
      Ok(()) => true,
      Err(e) => {
        warn!("命令 {} 发送失败: {}", command, e);
        false
      }
    }
  }

  pub fn poll_status(&self) -> Option<BodyStatus> {
    self.actuator.poll_status()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::{Cell, RefCell};

  #[derive(Default)]
  struct Recorder {
    sent: RefCell<Vec<String>>,
    failing: Cell<bool>,
  }

  impl Actuator for Recorder {
    type Error = String;

    fn send(&self, command: &Command) -> Result<(), Self::Error> {
      if self.failing.get() {
        return Err("链路断开".to_string());
      }
      self.sent.borrow_mut().push(command.to_string());
      Ok(())
    }
  }

  impl Recorder {
    fn take(&self) -> Vec<String> {
      self.sent.borrow_mut().drain(..).collect()
    }
  }

  fn link(policy: DuplicatePolicy) -> CommandLink<Recorder> {
    CommandLink::new(
      Recorder::default(),
      LimiterConfig {
        move_interval_ms: 20,
        duplicate_policy: policy,
      },
    )
  }

  fn ms(base: Instant, offset: u64) -> Instant {
    base + Duration::from_millis(offset)
  }

  #[test]
  fn identical_command_within_interval_is_dropped() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::WholePair);
    assert!(link.maybe_send_at(t0, ServoPosition::new(90.0, 90.0)));
    assert!(!link.maybe_send_at(ms(t0, 5), ServoPosition::new(90.0, 90.0)));
    assert_eq!(link.actuator().take(), ["SERVO_PAN:90", "SERVO_TILT:90"]);
  }

  #[test]
  fn changed_command_within_interval_is_dropped() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::WholePair);
    link.maybe_send_at(t0, ServoPosition::new(90.0, 90.0));
    assert!(!link.maybe_send_at(ms(t0, 19), ServoPosition::new(95.0, 90.0)));
    assert!(link.maybe_send_at(ms(t0, 20), ServoPosition::new(95.0, 90.0)));
  }

  #[test]
  fn unchanged_command_after_interval_is_dropped() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::WholePair);
    link.maybe_send_at(t0, ServoPosition::new(90.0, 90.0));
    // 舍入后相同
    assert!(!link.maybe_send_at(ms(t0, 100), ServoPosition::new(90.3, 89.8)));
  }

  #[test]
  fn whole_pair_sends_both_axes() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::WholePair);
    link.maybe_send_at(t0, ServoPosition::new(90.0, 90.0));
    link.actuator().take();
    assert!(link.maybe_send_at(ms(t0, 40), ServoPosition::new(92.0, 90.0)));
    assert_eq!(link.actuator().take(), ["SERVO_PAN:92", "SERVO_TILT:90"]);
  }

  #[test]
  fn per_axis_sends_only_changed_axis() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::PerAxis);
    link.maybe_send_at(t0, ServoPosition::new(90.0, 90.0));
    link.actuator().take();

    assert!(link.maybe_send_at(ms(t0, 40), ServoPosition::new(92.0, 90.0)));
    assert_eq!(link.actuator().take(), ["SERVO_PAN:92"]);

    assert!(link.maybe_send_at(ms(t0, 80), ServoPosition::new(92.0, 70.0)));
    assert_eq!(link.actuator().take(), ["SERVO_TILT:70"]);

    assert!(!link.maybe_send_at(ms(t0, 120), ServoPosition::new(92.0, 70.0)));
    assert!(link.actuator().take().is_empty());
  }

  #[test]
  fn transport_failure_does_not_advance_state() {
    let t0 = Instant::now();
    let mut link = link(DuplicatePolicy::WholePair);
    link.actuator().failing.set(true);
    assert!(!link.maybe_send_at(t0, ServoPosition::new(100.0, 80.0)));
    assert_eq!(link.limiter().last_sent(), None);

    link.actuator().failing.set(false);
    // 失败不计入间隔，立即重试
    assert!(link.maybe_send_at(ms(t0, 1), ServoPosition::new(100.0, 80.0)));
    assert_eq!(link.limiter().last_sent(), Some((100, 80)));
  }

  #[test]
  fn policy_from_cli_text() {
    assert_eq!("axis".parse(), Ok(DuplicatePolicy::PerAxis));
    assert_eq!("whole_pair".parse(), Ok(DuplicatePolicy::WholePair));
    assert!("none".parse::<DuplicatePolicy>().is_err());
  }
}
