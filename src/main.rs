// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
  sync::mpsc::SyncSender,
  thread,
};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use lumina::{
  FromUrl,
  conversation::ChannelBackend,
  input::InputWrapper,
  output::ActuatorWrapper,
  pipeline::Pipeline,
  state::SharedFlags,
  task::{Task, TrackingTask},
};

#[cfg(not(feature = "directory_record"))]
struct NoRecord;

#[cfg(not(feature = "directory_record"))]
impl lumina::output::Render<lumina::frame::HandFrame, lumina::pipeline::FrameReport> for NoRecord {
  type Error = std::convert::Infallible;

  fn render_result(
    &self,
    _frame: &lumina::frame::HandFrame,
    _report: &lumina::pipeline::FrameReport,
  ) -> Result<(), Self::Error> {
    Ok(())
  }
}

/// 控制台触发：w 唤醒，e 结束对话，say <文字> 模拟一条对话回复
fn spawn_console(flags: SharedFlags, replies: SyncSender<String>) -> Result<()> {
  thread::Builder::new()
    .name("lumina-console".to_string())
    .spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
          "w" => flags.fire_wake(),
          "e" => flags.request_end(),
          other => match other.strip_prefix("say ") {
            Some(text) => {
              if replies.send(text.to_string()).is_err() {
                break;
              }
            }
            None if other.is_empty() => {}
            None => warn!("未知指令: {}（w 唤醒, e 结束, say <文字>）", other),
          },
        }
      }
    })?;
  Ok(())
}

/// 把预置回复依次送入回复队列，队列满时等待会话消费
fn spawn_reply_feeder(path: &Path, replies: SyncSender<String>) -> Result<()> {
  let file = BufReader::new(File::open(path)?);
  info!("预置对话回复: {}", path.display());
  thread::Builder::new()
    .name("lumina-replies".to_string())
    .spawn(move || {
      for line in file.lines().map_while(Result::ok) {
        let line = line.trim().to_string();
        if line.is_empty() {
          continue;
        }
        if replies.send(line).is_err() {
          break;
        }
      }
    })?;
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("关键点输入: {}", args.input);
  info!("台灯本体: {}", args.actuator);

  let config = args.tracker_config()?;
  let input = InputWrapper::from_url(&args.input)?;
  let clock = input.clock();
  let actuator = ActuatorWrapper::from_url(&args.actuator)?;

  #[cfg(feature = "directory_record")]
  let recorder = match &args.record {
    Some(url) => {
      info!("调试记录: {}", url);
      Some(
        lumina::output::DirectoryRecordOutput::from_url(url)?
          .with_deadzone(config.servo.deadzone),
      )
    }
    None => None,
  };
  #[cfg(not(feature = "directory_record"))]
  let recorder: Option<NoRecord> = {
    if args.record.is_some() {
      warn!("未启用 directory_record 特性，忽略 --record");
    }
    None
  };

  let (replies, backend) = ChannelBackend::channel();
  if let Some(path) = &args.replies {
    spawn_reply_feeder(path, replies.clone())?;
  }

  let mut pipeline = Pipeline::new(&config, actuator, backend);
  spawn_console(pipeline.flags(), replies)?;

  TrackingTask::default()
    .with_frame_number(args.frame_number)
    .with_clock(clock)
    .with_realtime(args.realtime)
    .run_task(input, &mut pipeline, recorder)?;

  Ok(())
}
