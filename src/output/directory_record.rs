// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RawImage,
  output::Render,
  session::Prediction,
};

const RECORD_FILE_NAME: &str = "predictions.jsonl";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct RecordLine<'a> {
  time: DateTime<Utc>,
  frame: u64,
  width: u32,
  height: u32,
  #[serde(flatten)]
  prediction: &'a Prediction,
  #[serde(skip_serializing_if = "Option::is_none")]
  image: Option<&'a Path>,
}

/// 按日期分目录，以 JSON Lines 追加记录每一帧的预测结果。
///
/// `folder:///data/records?image` 同时保存原始帧为 PNG。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u64>,
  save_image: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let save_image = uri.query_pairs().any(|(k, _)| k == "image");
    Ok(Self::new(uri.path()).with_image(save_image))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      frame_counter: Mutex::new(0),
      save_image: false,
    }
  }

  pub fn with_image(mut self, save_image: bool) -> Self {
    self.save_image = save_image;
    self
  }

  fn frame_id(&self) -> u64 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|e| e.into_inner());
    *counter += 1;
    *counter
  }

  fn day_directory(&self, now: &DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }
    Ok(directory)
  }
}

impl Render<RawImage, Prediction> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RawImage, result: &Prediction) -> Result<(), Self::Error> {
    let now = Utc::now();
    let frame_id = self.frame_id();
    let directory = self.day_directory(&now)?;

    let image_path = if self.save_image {
      let path = directory.join(format!("{}-{:06}.png", now.format("%H-%M-%S"), frame_id));
      frame.to_rgb_image().save(&path)?;
      Some(path)
    } else {
      None
    };

    let line = RecordLine {
      time: now,
      frame: frame_id,
      width: frame.width(),
      height: frame.height(),
      prediction: result,
      image: image_path.as_deref(),
    };

    let record_path = directory.join(RECORD_FILE_NAME);
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&record_path)?;
    serde_json::to_writer(&mut file, &line)?;
    file.write_all(b"\n")?;
    debug!("记录第 {} 帧到 {}", frame_id, record_path.display());

    Ok(())
  }
}
