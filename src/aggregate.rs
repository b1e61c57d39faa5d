// 该文件是 Shanan （山南西风） 项目的一部分。
// src/aggregate.rs - 多帧预测的时序聚合
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

use crate::{NUM_CLASSES, model::ClassId, postprocess::TopClass};

/// 单帧预测记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRecord {
  pub class: ClassId,
  pub confidence: f32,
}

impl From<TopClass> for PredictionRecord {
  fn from(top: TopClass) -> Self {
    Self {
      class: top.class,
      confidence: top.confidence,
    }
  }
}

/// 由历史记录导出的聚合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
  /// 出现次数最多的类别
  pub class: ClassId,
  /// 最近一帧的置信度
  pub last_confidence: f32,
  /// `class` 的出现次数
  pub count: u64,
  /// 记录总数
  pub total: u64,
}

/// 只追加的预测历史与各类别计数。
///
/// 众数并列时取序号最小的类别。
#[derive(Debug, Clone, Default)]
pub struct TemporalAggregator {
  history: Vec<PredictionRecord>,
  counts: [u64; NUM_CLASSES],
}

impl TemporalAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, record: PredictionRecord) {
    self.counts[record.class.index()] += 1;
    self.history.push(record);
  }

  /// 尚无记录时返回 `None`
  pub fn most_frequent(&self) -> Option<ClassId> {
    if self.history.is_empty() {
      return None;
    }

    let mut best = 0;
    for (i, &count) in self.counts.iter().enumerate().skip(1) {
      if count > self.counts[best] {
        best = i;
      }
    }
    ClassId::new(best)
  }

  pub fn aggregate(&self) -> Option<AggregateResult> {
    let class = self.most_frequent()?;
    let last = self.history.last()?;
    Some(AggregateResult {
      class,
      last_confidence: last.confidence,
      count: self.counts[class.index()],
      total: self.history.len() as u64,
    })
  }

  pub fn count(&self, class: ClassId) -> u64 {
    self.counts[class.index()]
  }

  pub fn history(&self) -> &[PredictionRecord] {
    &self.history
  }

  pub fn len(&self) -> usize {
    self.history.len()
  }

  pub fn is_empty(&self) -> bool {
    self.history.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record_all(aggregator: &mut TemporalAggregator, classes: &[usize]) {
    for &c in classes {
      aggregator.record(PredictionRecord {
        class: ClassId::new(c).unwrap(),
        confidence: 0.5 + c as f32 / 100.0,
      });
    }
  }

  #[test]
  fn empty_aggregator_has_no_mode() {
    let aggregator = TemporalAggregator::new();
    assert_eq!(aggregator.most_frequent(), None);
    assert_eq!(aggregator.aggregate(), None);
  }

  #[test]
  fn mode_of_sequence() {
    let mut aggregator = TemporalAggregator::new();
    record_all(&mut aggregator, &[2, 2, 5, 2]);
    assert_eq!(aggregator.most_frequent(), ClassId::new(2));
    assert_eq!(aggregator.len(), 4);
  }

  #[test]
  fn ties_resolve_to_lowest_index() {
    for _ in 0..10 {
      let mut aggregator = TemporalAggregator::new();
      record_all(&mut aggregator, &[1, 3]);
      assert_eq!(aggregator.most_frequent(), ClassId::new(1));

      let mut aggregator = TemporalAggregator::new();
      record_all(&mut aggregator, &[6, 4, 6, 4]);
      assert_eq!(aggregator.most_frequent(), ClassId::new(4));
    }
  }

  #[test]
  fn aggregate_carries_last_confidence() {
    let mut aggregator = TemporalAggregator::new();
    record_all(&mut aggregator, &[0, 0, 7]);
    let result = aggregator.aggregate().unwrap();
    assert_eq!(result.class, ClassId::new(0).unwrap());
    assert_eq!(result.count, 2);
    assert_eq!(result.total, 3);
    assert!((result.last_confidence - 0.57).abs() < 1e-6);
  }
}
