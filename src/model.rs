// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型抽象与类别标签
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

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::NUM_CLASSES;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 类别序号，取值范围 [0, NUM_CLASSES)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClassId(u8);

impl ClassId {
  pub fn new(index: usize) -> Option<Self> {
    (index < NUM_CLASSES).then_some(Self(index as u8))
  }

  pub fn index(self) -> usize {
    self.0 as usize
  }

  pub fn all() -> impl Iterator<Item = ClassId> {
    (0..NUM_CLASSES as u8).map(ClassId)
  }
}

impl fmt::Display for ClassId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签数量不匹配: 期望 8, 实际 {0}")]
  CountMismatch(usize),
  #[error("标签文件解析错误: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct LabelFile {
  labels: Vec<String>,
}

/// 类别序号到名称的固定映射，会话创建时加载一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  labels: [String; NUM_CLASSES],
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
    let count = labels.len();
    let labels = labels
      .try_into()
      .map_err(|_| LabelError::CountMismatch(count))?;
    Ok(Self { labels })
  }

  /// `class-0` ... `class-7`
  pub fn indexed() -> Self {
    Self {
      labels: std::array::from_fn(|i| format!("class-{}", i)),
    }
  }

  /// 解析 `labels = ["...", ...]` 格式的 TOML
  pub fn from_toml_str(content: &str) -> Result<Self, LabelError> {
    let file: LabelFile = toml::from_str(content)?;
    Self::new(file.labels)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    debug!("读取标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  pub fn label(&self, class: ClassId) -> &str {
    &self.labels[class.index()]
  }

  pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
    ClassId::all().zip(self.labels.iter().map(String::as_str))
  }
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::indexed()
  }
}
