// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/common/mod.rs - 测试用推理后端
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

#![allow(dead_code)]

use shanan_classify::{
  NUM_CLASSES,
  engine::{Backend, EngineError, Runtime},
  model::LabelTable,
};

pub const LABELS: [&str; NUM_CLASSES] = [
  "cat", "dog", "bird", "fish", "horse", "rabbit", "hamster", "turtle",
];

pub fn labels() -> LabelTable {
  LabelTable::new(LABELS).unwrap()
}

/// 模型数据为 8 个小端 f32，前向推理始终返回这组 logits
pub struct FixedLogitsRuntime;

pub struct FixedLogits {
  logits: Vec<f32>,
}

pub fn fixed_model(logits: [f32; NUM_CLASSES]) -> Vec<u8> {
  logits.iter().flat_map(|v| v.to_le_bytes()).collect()
}

impl Runtime for FixedLogitsRuntime {
  type Backend = FixedLogits;

  fn load(&self, model: &[u8]) -> Result<Self::Backend, EngineError> {
    if model.len() != NUM_CLASSES * 4 {
      return Err(EngineError::ModelLoad(format!(
        "expected {} bytes, got {}",
        NUM_CLASSES * 4,
        model.len()
      )));
    }
    let logits = model
      .chunks_exact(4)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect();
    Ok(FixedLogits { logits })
  }
}

impl Backend for FixedLogits {
  fn name(&self) -> &str {
    "fixed"
  }

  fn forward(&mut self, _input: &[f32]) -> Result<Vec<f32>, EngineError> {
    Ok(self.logits.clone())
  }
}

/// 按 R、G、B 三个通道的均值打分：类别 0 / 1 / 2 分别对应红 / 绿 / 蓝占优。
/// 任意输入都可被接受，模型数据必须是 `b"channel-mean"`。
pub struct ChannelMeanRuntime;

pub struct ChannelMean;

impl Runtime for ChannelMeanRuntime {
  type Backend = ChannelMean;

  fn load(&self, model: &[u8]) -> Result<Self::Backend, EngineError> {
    if model != b"channel-mean" {
      return Err(EngineError::ModelLoad("unknown model".to_string()));
    }
    Ok(ChannelMean)
  }
}

impl Backend for ChannelMean {
  fn name(&self) -> &str {
    "channel-mean"
  }

  fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
    let mut sums = [0f64; 3];
    for pixel in input.chunks_exact(3) {
      for (s, &v) in sums.iter_mut().zip(pixel) {
        *s += v as f64;
      }
    }
    let n = (input.len() / 3).max(1) as f64;
    let mut logits = vec![0f32; NUM_CLASSES];
    for (i, s) in sums.iter().enumerate() {
      logits[i] = (s / n / 16.0) as f32;
    }
    Ok(logits)
  }
}

/// 推理时返回错误的后端
pub struct FailingRuntime;

pub struct Failing;

impl Runtime for FailingRuntime {
  type Backend = Failing;

  fn load(&self, _model: &[u8]) -> Result<Self::Backend, EngineError> {
    Ok(Failing)
  }
}

impl Backend for Failing {
  fn name(&self) -> &str {
    "failing"
  }

  fn forward(&mut self, _input: &[f32]) -> Result<Vec<f32>, EngineError> {
    Err(EngineError::Inference("kernel fault".to_string()))
  }
}
