// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess.rs - logits 后处理
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

use thiserror::Error;

use crate::{NUM_CLASSES, model::ClassId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  #[error("logits 长度不匹配: 期望 8, 实际 {0}")]
  MalformedLogits(usize),
  #[error("logits 包含非有限值: 下标 {0}")]
  NonFinite(usize),
}

/// softmax 后的类别概率，和为 1
pub type ClassProbabilities = [f32; NUM_CLASSES];

/// 当前帧的最高类别及其置信度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopClass {
  pub class: ClassId,
  pub confidence: f32,
}

fn check_logits(values: &[f32]) -> Result<(), PostprocessError> {
  if values.len() != NUM_CLASSES {
    return Err(PostprocessError::MalformedLogits(values.len()));
  }
  if let Some(index) = values.iter().position(|v| !v.is_finite()) {
    return Err(PostprocessError::NonFinite(index));
  }
  Ok(())
}

/// 数值稳定的 softmax：先减去最大值再取指数，在 f64 中累加
pub fn to_probabilities(logits: &[f32]) -> Result<ClassProbabilities, PostprocessError> {
  check_logits(logits)?;

  let max = logits
    .iter()
    .copied()
    .fold(f32::NEG_INFINITY, f32::max) as f64;

  let mut exps = [0f64; NUM_CLASSES];
  for (e, &logit) in exps.iter_mut().zip(logits) {
    *e = (logit as f64 - max).exp();
  }
  let sum: f64 = exps.iter().sum();

  let mut probabilities = [0f32; NUM_CLASSES];
  for (p, e) in probabilities.iter_mut().zip(exps) {
    *p = (e / sum) as f32;
  }
  Ok(probabilities)
}

/// 最大值所在的最小下标；只有严格大于时才更新
pub fn argmax(values: &[f32]) -> Option<usize> {
  let (first, rest) = values.split_first()?;
  let mut index = 0;
  let mut max = *first;
  for (i, &v) in rest.iter().enumerate() {
    if v > max {
      max = v;
      index = i + 1;
    }
  }
  Some(index)
}

pub fn top_class(logits: &[f32]) -> Result<TopClass, PostprocessError> {
  let probabilities = to_probabilities(logits)?;
  // 在 logits 上取 argmax，避免概率舍入后产生新的并列
  let index = argmax(logits).ok_or(PostprocessError::MalformedLogits(0))?;
  let class = ClassId::new(index).ok_or(PostprocessError::MalformedLogits(logits.len()))?;

  Ok(TopClass {
    class,
    confidence: probabilities[index],
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_distribution(p: &ClassProbabilities) {
    let sum: f64 = p.iter().map(|&v| v as f64).sum();
    assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
    assert!(p.iter().all(|&v| v >= 0.0));
  }

  #[test]
  fn probabilities_sum_to_one() {
    let cases: [[f32; 8]; 4] = [
      [0.0; 8],
      [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 8.0],
      [-3.5, 2.25, 0.0, 7.0, -12.0, 1.0, 0.5, 3.0],
      [1000.0, 999.0, -1000.0, 0.0, 500.0, 1000.0, 2.0, 3.0],
    ];
    for logits in cases {
      assert_distribution(&to_probabilities(&logits).unwrap());
    }
  }

  #[test]
  fn large_logits_do_not_overflow() {
    let p = to_probabilities(&[1.0e4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    assert!(p.iter().all(|v| v.is_finite()));
    assert!((p[0] - 1.0).abs() < 1e-6);
  }

  #[test]
  fn uniform_logits_give_uniform_probabilities() {
    let p = to_probabilities(&[2.0; 8]).unwrap();
    for v in p {
      assert!((v - 0.125).abs() < 1e-7);
    }
  }

  #[test]
  fn softmax_is_deterministic() {
    let logits = [0.3, -1.2, 4.4, 0.0, 2.0, 2.0, -7.0, 1.5];
    assert_eq!(
      to_probabilities(&logits).unwrap(),
      to_probabilities(&logits).unwrap()
    );
  }

  #[test]
  fn wrong_length_is_malformed() {
    assert_eq!(
      to_probabilities(&[0.0; 7]),
      Err(PostprocessError::MalformedLogits(7))
    );
    assert_eq!(
      top_class(&[0.0; 9]),
      Err(PostprocessError::MalformedLogits(9))
    );
  }

  #[test]
  fn non_finite_logits_are_rejected() {
    let mut logits = [0.0f32; 8];
    logits[0] = f32::INFINITY;
    assert_eq!(
      to_probabilities(&logits),
      Err(PostprocessError::NonFinite(0))
    );
    let mut logits = [0.0f32; 8];
    logits[1] = f32::NAN;
    logits[7] = 1.0;
    assert_eq!(top_class(&logits), Err(PostprocessError::NonFinite(1)));
  }

  #[test]
  fn argmax_first_maximum_wins() {
    assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0]), Some(1));
    assert_eq!(argmax(&[5.0; 8]), Some(0));
    assert_eq!(argmax(&[-1.0, -2.0, -0.5]), Some(2));
    assert_eq!(argmax(&[]), None);
  }

  #[test]
  fn top_class_reports_its_own_probability() {
    let top = top_class(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 8.0]).unwrap();
    assert_eq!(top.class.index(), 7);
    assert!(top.confidence > 0.9);
  }
}
