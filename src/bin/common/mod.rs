// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/common/mod.rs - 示例程序公共部分
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

use shanan_classify::{Session, model::LabelTable};
use tracing::info;

/// 读取标签文件，未指定时使用 `class-N` 作为标签
pub fn load_labels(path: Option<&PathBuf>) -> Result<LabelTable> {
  match path {
    Some(path) => LabelTable::from_path(path)
      .with_context(|| format!("无法读取标签文件: {}", path.display())),
    None => Ok(LabelTable::indexed()),
  }
}

/// 按模型 URL 的方案选择推理后端并创建会话
pub fn open_session(model: &Url, labels: LabelTable) -> Result<Session> {
  info!("加载模型文件: {}", model.path());
  let data =
    std::fs::read(model.path()).with_context(|| format!("无法读取模型文件: {}", model.path()))?;

  match model.scheme() {
    #[cfg(feature = "rknpu")]
    "rknn" => {
      use shanan_classify::{FromUrl, engine::RknnRuntime};
      let runtime = RknnRuntime::from_url(model)?;
      Ok(Session::create(&runtime, &data, labels)?)
    }
    #[cfg(feature = "onnx")]
    "onnx" => {
      use shanan_classify::{FromUrl, engine::OnnxRuntime};
      let runtime = OnnxRuntime::from_url(model)?;
      Ok(Session::create(&runtime, &data, labels)?)
    }
    scheme => {
      drop((data, labels));
      anyhow::bail!("不支持的模型方案: {}（检查是否启用了对应的后端特性）", scheme)
    }
  }
}
