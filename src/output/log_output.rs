// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::convert::Infallible;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawImage,
  output::{OutputError, Render},
  session::Prediction,
};

/// 将预测结果写入 tracing 日志，`log://` 或 `log://?quiet` （仅在累计类别变化时输出）
#[derive(Debug, Default)]
pub struct LogOutput {
  quiet: bool,
  last: std::sync::Mutex<Option<String>>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    let quiet = url.query_pairs().any(|(k, _)| k == "quiet");
    Ok(Self {
      quiet,
      last: Default::default(),
    })
  }
}

impl Render<RawImage, Prediction> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &RawImage, result: &Prediction) -> Result<(), Self::Error> {
    if self.quiet {
      let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
      if last.as_deref() == Some(result.most_frequent_label.as_str()) {
        return Ok(());
      }
      *last = Some(result.most_frequent_label.clone());
    }

    info!(
      "{}x{} 图像: {} ({:.2}%), 累计最多: {}",
      frame.width(),
      frame.height(),
      result.label,
      result.confidence * 100.0,
      result.most_frequent_label
    );
    Ok(())
  }
}
