// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine/onnx.rs - ONNX Runtime 推理后端
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

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor,
};
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, INPUT_SIZE,
  engine::{Backend, EngineError, Runtime},
  frame::RGB_CHANNELS,
};

/// ONNX 运行时，模型输入形状为 `[1, 224, 224, 3]`
#[derive(Debug, Default)]
pub struct OnnxRuntime {
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for OnnxRuntime {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxRuntime {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::ModelLoad(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let intra_threads = url
      .query_pairs()
      .find(|(k, _)| k == "threads")
      .and_then(|(_, v)| v.parse().ok());

    Ok(Self { intra_threads })
  }
}

impl OnnxRuntime {
  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }
}

impl Runtime for OnnxRuntime {
  type Backend = OnnxBackend;

  fn load(&self, model: &[u8]) -> Result<Self::Backend, EngineError> {
    let load = |e: ort::Error| EngineError::ModelLoad(e.to_string());

    debug!("创建 ONNX Runtime 会话");
    let mut builder = Session::builder()
      .map_err(load)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(load)?;
    if let Some(threads) = self.intra_threads {
      builder = builder.with_intra_threads(threads).map_err(load)?;
    }
    let session = builder.commit_from_memory(model).map_err(load)?;

    if session.inputs.len() != 1 || session.outputs.is_empty() {
      return Err(EngineError::ModelLoad(format!(
        "预期 1 个输入和至少 1 个输出, 实际为 {}/{}",
        session.inputs.len(),
        session.outputs.len()
      )));
    }

    Ok(OnnxBackend { session })
  }
}

pub struct OnnxBackend {
  session: Session,
}

impl Backend for OnnxBackend {
  fn name(&self) -> &str {
    "onnx"
  }

  fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
    let inference = |e: ort::Error| EngineError::Inference(e.to_string());

    let shape = [1usize, INPUT_SIZE as usize, INPUT_SIZE as usize, RGB_CHANNELS];
    let tensor = Tensor::from_array((shape, input.to_vec())).map_err(inference)?;

    let outputs = self.session.run(ort::inputs![tensor]).map_err(inference)?;
    let (_, logits) = outputs[0]
      .try_extract_tensor::<f32>()
      .map_err(inference)?;
    debug!("模型推理结果：{:?}", logits);

    Ok(logits.to_vec())
  }
}
