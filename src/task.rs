// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/task.rs - 帧循环任务
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
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  conversation::ConversationBackend,
  frame::HandFrame,
  input::FrameClock,
  model::Model,
  output::{Actuator, Render},
  pipeline::{FrameReport, Pipeline},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// Ctrl-C 只发出退出请求，30 秒内循环未退出则强制结束进程
fn interrupt_channel() -> Receiver<()> {
  let (tx, rx) = mpsc::channel();

  let handler = ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  });
  if let Err(e) = handler {
    warn!("无法设置 Ctrl-C 处理: {}", e);
  }

  rx
}

fn reached(frame_number: Option<usize>, frame_index: usize) -> bool {
  frame_number.is_some_and(|n| frame_index >= n)
}

/// 只运行模型并输出结果，不驱动执行器
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: fmt::Display,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let rx = interrupt_channel();

    let mut frame_index = 0;
    for frame in input {
      frame_index += 1;
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      if let Err(e) = output.render_result(&frame, &result) {
        warn!("第 {} 帧输出失败: {}", frame_index, e);
      }
      info!("第 {} 帧推理完成，耗时: {:.2?}", frame_index, elapsed);
      if reached(self.frame_number, frame_index) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}

/// 完整的跟踪循环：识别、舵机、状态机与对话会话
#[derive(Debug)]
pub struct TrackingTask {
  frame_number: Option<usize>,
  clock: FrameClock,
  realtime: bool,
}

impl Default for TrackingTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      clock: FrameClock::Wall,
      realtime: false,
    }
  }
}

impl TrackingTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_clock(mut self, clock: FrameClock) -> Self {
    self.clock = clock;
    self
  }

  /// 回放时按帧时间戳等待，保持原始节奏
  pub fn with_realtime(mut self, realtime: bool) -> Self {
    self.realtime = realtime;
    self
  }
}

struct ReplayClock {
  start: Instant,
  first_timestamp: Option<u64>,
  realtime: bool,
}

impl ReplayClock {
  fn instant_for(&mut self, frame: &HandFrame) -> Instant {
    let first = *self.first_timestamp.get_or_insert(frame.timestamp_ms);
    let at = self.start + Duration::from_millis(frame.timestamp_ms.saturating_sub(first));
    if self.realtime {
      let now = Instant::now();
      if at > now {
        thread::sleep(at - now);
      }
    }
    at
  }
}

impl<'p, I, A, B, O> Task<I, &'p mut Pipeline<A, B>, O> for TrackingTask
where
  I: Iterator<Item = HandFrame>,
  A: Actuator,
  A::Error: fmt::Display,
  B: ConversationBackend + Clone,
  O: Render<HandFrame, FrameReport>,
  O::Error: fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: &'p mut Pipeline<A, B>, output: O) -> Result<(), Self::Error> {
    info!("开始跟踪任务...");
    let rx = interrupt_channel();
    let mut clock = ReplayClock {
      start: Instant::now(),
      first_timestamp: None,
      realtime: self.realtime,
    };

    pipeline.startup();

    let mut frame_index = 0;
    let mut locked_frames = 0;
    for frame in input {
      frame_index += 1;
      let now = match self.clock {
        FrameClock::Wall => Instant::now(),
        FrameClock::Timestamp => clock.instant_for(&frame),
      };

      let report = pipeline.process_frame(&frame, now);
      if report.locked() {
        locked_frames += 1;
      }
      if let Err(e) = output.render_result(&frame, &report) {
        warn!("第 {} 帧记录失败: {}", frame.index, e);
      }

      if reached(self.frame_number, frame_index) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    pipeline.shutdown();
    info!(
      "跟踪任务完成: 共 {} 帧，锁定 {} 帧，最终状态 {}",
      frame_index,
      locked_frames,
      pipeline.state()
    );
    Ok(())
  }
}
