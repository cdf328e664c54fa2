// 该文件是 Lumina （流明台灯） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use lumina::{
  config::{ConfigError, TrackerConfig},
  control::HandLossPolicy,
  output::DuplicatePolicy,
};

/// Lumina 台灯手势跟踪
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 关键点输入
  /// - 回放: landmarks:///path/to/frames.jsonl[?fps=30]
  /// - 实时: hands+udp://0.0.0.0:6000
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 台灯本体
  /// - udp://192.168.1.50:5005[?bind=5006]
  /// - sim://body（只写日志）
  #[arg(long, value_name = "ACTUATOR", default_value = "sim://body")]
  pub actuator: Url,

  /// 调试记录目录，如 folder:///tmp/lumina[?always]
  #[arg(long, value_name = "OUTPUT")]
  pub record: Option<Url>,

  /// JSON 配置文件，只需写出要覆盖的字段
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 预置的对话回复，每行一条
  #[arg(long, value_name = "FILE")]
  pub replies: Option<PathBuf>,

  /// 舵机死区（像素）
  #[arg(long, value_name = "PIXELS")]
  pub deadzone: Option<f32>,

  /// 锚点平滑系数 [0, 1)
  #[arg(long, value_name = "FACTOR")]
  pub smoothing: Option<f32>,

  /// 舵机命令去重策略: pair | axis
  #[arg(long, value_name = "POLICY")]
  pub duplicate_policy: Option<DuplicatePolicy>,

  /// 手势丢失后舵机策略: hold | reset
  #[arg(long, value_name = "POLICY")]
  pub hand_loss: Option<HandLossPolicy>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 回放时按时间戳节奏运行
  #[arg(long)]
  pub realtime: bool,
}

impl Args {
  pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
    let mut config = match &self.config {
      Some(path) => TrackerConfig::from_json_file(path)?,
      None => TrackerConfig::default(),
    };

    if let Some(deadzone) = self.deadzone {
      config.servo.deadzone = deadzone;
    }
    if let Some(factor) = self.smoothing {
      config.smoother.factor = factor;
    }
    if let Some(policy) = self.duplicate_policy {
      config.limiter.duplicate_policy = policy;
    }
    if let Some(policy) = self.hand_loss {
      config.hand_loss = policy;
    }

    config.validate()?;
    Ok(config)
  }
}
