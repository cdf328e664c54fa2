// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/bin/gesture_probe.rs - 手势锁定判定调试工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{convert::Infallible, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use lumina::{
  FromUrl,
  config::TrackerConfig,
  frame::HandFrame,
  input::InputWrapper,
  model::{GestureClassifier, GestureDecision},
  output::Render,
  task::{ContinuousTask, Task},
};

/// 逐帧打印手势特征与锁定判定，不连接台灯本体
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 关键点输入
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// JSON 配置文件，只使用其中的手势阈值
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

struct DecisionPrinter;

impl Render<HandFrame, GestureDecision> for DecisionPrinter {
  type Error = Infallible;

  fn render_result(&self, frame: &HandFrame, decision: &GestureDecision) -> Result<(), Self::Error> {
    match decision.features {
      Some(features) => println!(
        "#{:<5} {:<24} 伸直度 {:.2} 并拢 {:<5} 掌心 {:<5} 框 {}x{}",
        frame.index,
        decision.to_string(),
        features.straightness,
        features.fingers_together,
        features.palm.facing_camera,
        decision.bbox.width(),
        decision.bbox.height(),
      ),
      None => println!("#{:<5} {}", frame.index, decision),
    }
    Ok(())
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!("关键点输入: {}", args.input);

  let config = match &args.config {
    Some(path) => TrackerConfig::from_json_file(path)?,
    None => TrackerConfig::default(),
  };
  config.validate()?;

  let input = InputWrapper::from_url(&args.input)?;
  let classifier = GestureClassifier::new(config.gesture);

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(input, classifier, DecisionPrinter)?;

  Ok(())
}
