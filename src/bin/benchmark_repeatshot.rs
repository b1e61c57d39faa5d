// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理基准测试
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_classify::{
  FromUrl,
  input::ImageFileInput,
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Shanan 分类基准测试参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径（rknn:///path/model.rknn 或 onnx:///path/model.onnx）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源（image:///path/a.jpg）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log://?quiet")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value = "1000")]
  pub times: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);

  let input = ImageFileInput::from_url(&args.input)?;
  let session = common::open_session(&args.model, common::load_labels(None)?)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let report = RepeatShotTask::default()
    .with_times(args.times)
    .run_task(input, session, output)?;
  if let Some(average) = report.average_latency {
    info!("{} 次推理，平均耗时: {:.2?}", report.frames, average);
  }

  Ok(())
}
