// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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
  collections::VecDeque,
  path::{Path, PathBuf},
};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RawImage};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("目录中没有图像文件: {0}")]
  NoImages(String),
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// 从单个图像文件或目录（按文件名排序）依次读取图像。
///
/// `image:///path/to/a.jpg?repeat=3` 会把同一张图重复输出 3 次。
#[derive(Debug)]
pub struct ImageFileInput {
  paths: VecDeque<PathBuf>,
  skipped: Vec<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    let repeat = url
      .query_pairs()
      .find(|(k, _)| k == "repeat")
      .and_then(|(_, v)| v.parse::<usize>().ok())
      .unwrap_or(1);

    let input = Self::open(url.path())?;
    let paths = input
      .paths
      .iter()
      .cycle()
      .take(input.paths.len() * repeat)
      .cloned()
      .collect();
    Ok(Self {
      paths,
      skipped: Vec::new(),
    })
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();

    let paths: VecDeque<PathBuf> = if path.is_dir() {
      let mut entries = Vec::new();
      for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_image_file(&entry_path) {
          entries.push(entry_path);
        }
      }
      entries.sort();
      entries.into()
    } else {
      // 先解码一次，尽早暴露不可读的文件
      ImageReader::open(path)?.with_guessed_format()?.decode()?;
      VecDeque::from([path.to_path_buf()])
    };

    if paths.is_empty() {
      return Err(ImageFileInputError::NoImages(path.display().to_string()));
    }
    debug!("图像输入共 {} 个文件", paths.len());

    Ok(Self {
      paths,
      skipped: Vec::new(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.paths.len()
  }

  /// 迭代过程中因无法解码而跳过的文件
  pub fn skipped(&self) -> &[PathBuf] {
    &self.skipped
  }

  fn load(path: &Path) -> Result<RawImage, ImageFileInputError> {
    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    Ok(RawImage::from(&image))
  }
}

impl Iterator for ImageFileInput {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.paths.pop_front() {
      match Self::load(&path) {
        Ok(image) => return Some(image),
        Err(e) => {
          warn!("跳过无法读取的图像 {}: {}", path.display(), e);
          self.skipped.push(path);
        }
      }
    }
    None
  }
}
