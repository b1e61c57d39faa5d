// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 输入张量构建
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

use std::marker::PhantomData;

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  INPUT_SIZE,
  frame::{InputTensor, RGB_CHANNELS, RawImage, RgbNhwcTensor},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
  #[error("图像无效: {0}")]
  InvalidImage(String),
  #[error("张量形状不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
}

/// 将任意尺寸的图像双线性缩放到 `W`x`H`，再按 R、G、B 顺序展开为 f32。
///
/// 像素值不做归一化，保持 [0.0, 255.0] 的原始强度。
#[derive(Debug, Default, Clone, Copy)]
pub struct TensorBuilder<const W: u32, const H: u32> {
  _phantom: PhantomData<RgbNhwcTensor<W, H>>,
}

/// 分类模型使用的 224x224 构建器
pub type ClassifierTensorBuilder = TensorBuilder<INPUT_SIZE, INPUT_SIZE>;

impl<const W: u32, const H: u32> TensorBuilder<W, H> {
  pub fn new() -> Self {
    Self {
      _phantom: PhantomData,
    }
  }

  pub fn build(&self, image: &RawImage) -> Result<RgbNhwcTensor<W, H>, TensorError> {
    if image.is_empty() {
      error!("输入图像为空: {}x{}", image.width(), image.height());
      return Err(TensorError::InvalidImage(format!(
        "图像宽高不能为零: {}x{}",
        image.width(),
        image.height()
      )));
    }

    let source = image.to_rgb_image();
    let resized = if source.dimensions() == (W, H) {
      source
    } else {
      debug!(
        "缩放图像: {}x{} -> {}x{}",
        image.width(),
        image.height(),
        W,
        H
      );
      imageops::resize(&source, W, H, FilterType::Triangle)
    };

    let mut data = Vec::with_capacity(RgbNhwcTensor::<W, H>::LEN);
    // to_rgb_image 已按位移规则拆出 R、G、B，这里只需按序展开
    for pixel in resized.pixels() {
      let [r, g, b] = pixel.0;
      data.push(r as f32);
      data.push(g as f32);
      data.push(b as f32);
    }
    debug_assert_eq!(data.len(), W as usize * H as usize * RGB_CHANNELS);

    RgbNhwcTensor::try_from(data)
  }
}

/// 使用 224x224 构建器生成分类输入
pub fn build(image: &RawImage) -> Result<InputTensor, TensorError> {
  ClassifierTensorBuilder::new().build(image)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::pack_rgb;

  #[test]
  fn zero_sized_image_is_rejected() {
    let image = RawImage::new(0, 10, vec![]).unwrap();
    assert!(matches!(build(&image), Err(TensorError::InvalidImage(_))));

    let image = RawImage::new(10, 0, vec![]).unwrap();
    assert!(matches!(build(&image), Err(TensorError::InvalidImage(_))));
  }

  #[test]
  fn output_length_is_fixed_for_any_size() {
    for (w, h) in [(1, 1), (224, 224), (640, 480), (17, 300), (3000, 2)] {
      let tensor = build(&RawImage::filled(w, h, [1, 2, 3])).unwrap();
      assert_eq!(tensor.len(), 224 * 224 * 3, "{}x{}", w, h);
    }
  }

  #[test]
  fn channels_are_emitted_in_rgb_order_without_scaling() {
    let tensor = build(&RawImage::filled(50, 70, [200, 100, 7])).unwrap();
    for chunk in tensor.as_slice().chunks(3) {
      assert_eq!(chunk, &[200.0, 100.0, 7.0]);
    }
  }

  #[test]
  fn native_size_image_is_copied_verbatim() {
    let pixels: Vec<u32> = (0..4u32)
      .map(|i| pack_rgb([i as u8, (i * 2) as u8, (i * 3) as u8]))
      .collect();
    let image = RawImage::new(2, 2, pixels).unwrap();
    let tensor = TensorBuilder::<2, 2>::new().build(&image).unwrap();
    assert_eq!(
      tensor.as_slice(),
      &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 3.0, 6.0, 9.0]
    );
  }

  #[test]
  fn alpha_bits_are_ignored() {
    let image = RawImage::new(1, 1, vec![0x00_0A_0B_0C]).unwrap();
    let tensor = TensorBuilder::<1, 1>::new().build(&image).unwrap();
    assert_eq!(tensor.as_slice(), &[10.0, 11.0, 12.0]);
  }

  #[test]
  fn build_is_deterministic() {
    let pixels: Vec<u32> = (0..(31 * 17)).map(|i| i * 7919).collect();
    let image = RawImage::new(31, 17, pixels).unwrap();
    assert_eq!(build(&image).unwrap(), build(&image).unwrap());
  }
}
