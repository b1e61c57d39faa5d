// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 原始图像与 NHWC 张量定义
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

use image::{Rgb, RgbImage};

use crate::{INPUT_SIZE, tensor::TensorError};

pub const RGB_CHANNELS: usize = 3;

/// 将 8 位 RGB 分量打包为 `0xAARRGGBB`，alpha 固定为 0xFF
pub fn pack_rgb(rgb: [u8; 3]) -> u32 {
  0xFF00_0000 | (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32
}

/// 从打包像素中取出 R、G、B 分量，忽略高 8 位
pub fn unpack_rgb(pixel: u32) -> [u8; 3] {
  [
    ((pixel >> 16) & 0xFF) as u8,
    ((pixel >> 8) & 0xFF) as u8,
    (pixel & 0xFF) as u8,
  ]
}

/// 解码后的原始图像，按行优先存储打包的 32 位像素。
///
/// 创建后不可变，张量构建阶段只做只读借用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
  width: u32,
  height: u32,
  pixels: Box<[u32]>,
}

impl RawImage {
  pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, TensorError> {
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
      return Err(TensorError::InvalidImage(format!(
        "像素数量不匹配: 期望 {}x{}={}, 实际 {}",
        width,
        height,
        expected,
        pixels.len()
      )));
    }

    Ok(Self {
      width,
      height,
      pixels: pixels.into_boxed_slice(),
    })
  }

  /// 生成单色图像
  pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
    let pixels = vec![pack_rgb(rgb); width as usize * height as usize];
    Self {
      width,
      height,
      pixels: pixels.into_boxed_slice(),
    }
  }

  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let pixels: Vec<u32> = image.pixels().map(|p| pack_rgb(p.0)).collect();
    Self {
      width,
      height,
      pixels: pixels.into_boxed_slice(),
    }
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    RgbImage::from_fn(self.width, self.height, |x, y| {
      Rgb(unpack_rgb(self.pixel(x, y)))
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn pixels(&self) -> &[u32] {
    &self.pixels
  }

  // 调用方保证坐标在图像范围内
  fn pixel(&self, x: u32, y: u32) -> u32 {
    self.pixels[y as usize * self.width as usize + x as usize]
  }
}

impl From<&RgbImage> for RawImage {
  fn from(image: &RgbImage) -> Self {
    RawImage::from_rgb_image(image)
  }
}

impl From<RgbImage> for RawImage {
  fn from(image: RgbImage) -> Self {
    RawImage::from_rgb_image(&image)
  }
}

/// NHWC 排布的 f32 张量，数值为未归一化的通道强度 [0.0, 255.0]
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

/// 分类模型的输入：224x224x3
pub type InputTensor = RgbNhwcTensor<INPUT_SIZE, INPUT_SIZE>;

impl<const W: u32, const H: u32> RgbNhwcTensor<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 本机字节序的字节视图，供按字节接收输入的运行时使用
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.data)
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for RgbNhwcTensor<W, H> {
  type Error = TensorError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(TensorError::ShapeMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbNhwcTensor<W, H> {
  fn default() -> Self {
    let data = vec![0f32; Self::LEN].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> AsRef<[f32]> for RgbNhwcTensor<W, H> {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}
