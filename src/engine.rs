// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine.rs - 推理引擎
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

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{NUM_CLASSES, frame::InputTensor};

#[cfg(feature = "rknpu")]
mod rknn;
#[cfg(feature = "rknpu")]
pub use self::rknn::{RknnBackend, RknnRuntime};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxBackend, OnnxRuntime};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
  #[error("模型加载错误: {0}")]
  ModelLoad(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("推理引擎未加载或已释放")]
  NotLoaded,
}

/// 一次前向推理得到的原始 logits，按类别序号排列
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputLogits([f32; NUM_CLASSES]);

impl OutputLogits {
  pub fn new(values: [f32; NUM_CLASSES]) -> Self {
    Self(values)
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }

  pub fn into_inner(self) -> [f32; NUM_CLASSES] {
    self.0
  }
}

impl TryFrom<Vec<f32>> for OutputLogits {
  type Error = EngineError;

  fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
    let len = values.len();
    let values: [f32; NUM_CLASSES] = values.try_into().map_err(|_| {
      EngineError::Inference(format!(
        "模型输出长度不匹配: 期望 {}, 实际 {}",
        NUM_CLASSES, len
      ))
    })?;
    Ok(Self(values))
  }
}

impl AsRef<[f32]> for OutputLogits {
  fn as_ref(&self) -> &[f32] {
    &self.0
  }
}

/// 已加载的数值计算后端，负责一次定长的前向推理。
///
/// 实现必须是确定性的：相同权重与相同输入产生相同输出。
pub trait Backend: Send {
  fn name(&self) -> &str;

  /// 模型期望的输入长度
  fn input_len(&self) -> usize {
    InputTensor::LEN
  }

  fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError>;
}

/// 从模型字节创建后端的运行时
pub trait Runtime {
  type Backend: Backend + 'static;

  fn load(&self, model: &[u8]) -> Result<Self::Backend, EngineError>;
}

/// 独占推理后端的句柄。
///
/// `release` 后再次 `run` 返回 [`EngineError::NotLoaded`]；句柄析构时自动释放。
pub struct EngineHandle {
  backend: Option<Box<dyn Backend>>,
}

impl std::fmt::Debug for EngineHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EngineHandle")
      .field("backend", &self.backend.as_ref().map(|b| b.name()))
      .finish()
  }
}

impl EngineHandle {
  pub fn load<R: Runtime>(runtime: &R, model: &[u8]) -> Result<Self, EngineError> {
    if model.is_empty() {
      error!("模型数据为空");
      return Err(EngineError::ModelLoad("模型数据为空".to_string()));
    }

    info!(
      "加载模型，大小: {:.2} MB",
      model.len() as f64 / (1024.0 * 1024.0)
    );
    let backend = runtime.load(model).inspect_err(|e| {
      error!("模型加载失败: {}", e);
    })?;
    info!("模型加载完成，推理后端: {}", backend.name());

    Ok(Self {
      backend: Some(Box::new(backend)),
    })
  }

  /// 尚未加载任何模型的句柄
  pub fn unloaded() -> Self {
    Self { backend: None }
  }

  pub fn is_loaded(&self) -> bool {
    self.backend.is_some()
  }

  pub fn backend_name(&self) -> Option<&str> {
    self.backend.as_ref().map(|b| b.name())
  }

  pub fn run(&mut self, input: &InputTensor) -> Result<OutputLogits, EngineError> {
    let backend = self.backend.as_mut().ok_or(EngineError::NotLoaded)?;

    let expected = backend.input_len();
    if input.len() != expected {
      error!("输入长度不匹配: 期望 {}, 实际 {}", expected, input.len());
      return Err(EngineError::Inference(format!(
        "输入长度不匹配: 期望 {}, 实际 {}",
        expected,
        input.len()
      )));
    }

    let now = Instant::now();
    let output = backend.forward(input.as_slice())?;
    debug!("前向推理完成，耗时: {:.2?}", now.elapsed());

    if let Some(index) = output.iter().position(|v| !v.is_finite()) {
      error!("模型输出包含非有限值: 下标 {} = {}", index, output[index]);
      return Err(EngineError::Inference(format!(
        "非有限输出: 下标 {} = {}",
        index, output[index]
      )));
    }

    OutputLogits::try_from(output)
  }

  /// 释放后端资源，重复调用无副作用
  pub fn release(&mut self) {
    match self.backend.take() {
      Some(backend) => {
        info!("释放推理后端: {}", backend.name());
        drop(backend);
      }
      None => debug!("推理后端已释放，忽略"),
    }
  }
}

impl Drop for EngineHandle {
  fn drop(&mut self) {
    self.release();
  }
}
