// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续图像分类
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_classify::{
  FromUrl,
  input::ImageFileInput,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Shanan 分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径（rknn:///path/model.rknn 或 onnx:///path/model.onnx）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源（image:///path/dir 或 image:///path/a.jpg?repeat=10）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径（log://、log://?quiet 或 folder:///path）
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 标签文件（TOML）
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<PathBuf>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = common::load_labels(args.labels.as_ref())?;
  let input = ImageFileInput::from_url(&args.input)?;
  let session = common::open_session(&args.model, labels)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let report = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt()
    .run_task(input, session, output)?;
  info!("共处理 {} 帧", report.frames);

  Ok(())
}
