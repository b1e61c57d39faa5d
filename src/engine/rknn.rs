// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine/rknn.rs - RKNN NPU 推理后端
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{Backend, EngineError, Runtime},
};

const RKNN_NUM_INPUTS: u32 = 1;
const RKNN_NUM_OUTPUTS: u32 = 1;

fn invalid(msg: &str, e: rknpu::Error) -> EngineError {
  EngineError::ModelLoad(format!("{}: {}", msg, e))
}

/// RKNN 运行时，模型数据为 `.rknn` 文件内容
#[derive(Debug, Default)]
pub struct RknnRuntime {
  flags: InitFlags,
}

impl FromUrlWithScheme for RknnRuntime {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknnRuntime {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::ModelLoad(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }
    Ok(Self::default())
  }
}

impl RknnRuntime {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }
}

impl Runtime for RknnRuntime {
  type Backend = RknnBackend;

  fn load(&self, model: &[u8]) -> Result<Self::Backend, EngineError> {
    debug!("创建 RKNN 推理上下文");
    let context = Context::new(model, self.flags.clone())
      .map_err(|e| invalid("无法创建 RKNN 上下文", e))?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| invalid("无法获取输出数量", e))?;

    if num_inputs != RKNN_NUM_INPUTS || num_outputs != RKNN_NUM_OUTPUTS {
      error!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        RKNN_NUM_INPUTS, RKNN_NUM_OUTPUTS, num_inputs, num_outputs
      );
      return Err(EngineError::ModelLoad(format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        RKNN_NUM_INPUTS, RKNN_NUM_OUTPUTS, num_inputs, num_outputs
      )));
    }

    Ok(RknnBackend { context })
  }
}

pub struct RknnBackend {
  context: Context,
}

impl Backend for RknnBackend {
  fn name(&self) -> &str {
    "rknn"
  }

  fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
    let inference = |e: rknpu::Error| EngineError::Inference(e.to_string());

    debug!("设置模型输入");
    self
      .context
      .set_input(
        0,
        bytemuck::cast_slice(input),
        TensorFormat::NHWC,
        TensorType::Float32,
      )
      .map_err(inference)?;

    debug!("执行模型推理");
    self.context.run().map_err(inference)?;

    debug!("获取模型输出");
    let output = self.context.get_outputs().map_err(inference)?;
    let logits = output.get_f32(0).map_err(inference)?;
    debug!("模型推理结果：{:?}", logits);

    Ok(logits.to_vec())
  }
}
