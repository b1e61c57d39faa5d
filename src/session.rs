// 该文件是 Shanan （山南西风） 项目的一部分。
// src/session.rs - 预测会话
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

use std::{sync::Mutex, time::Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  aggregate::{PredictionRecord, TemporalAggregator},
  engine::{EngineError, EngineHandle, Runtime},
  frame::RawImage,
  model::{ClassId, LabelTable, Model},
  postprocess::{self, PostprocessError},
  tensor::{ClassifierTensorBuilder, TensorError},
};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("会话已关闭")]
  Closed,
  #[error("会话锁已损坏")]
  Poisoned,
  #[error("张量构建错误: {0}")]
  Tensor(#[from] TensorError),
  #[error("推理引擎错误: {0}")]
  Engine(#[from] EngineError),
  #[error("后处理错误: {0}")]
  Postprocess(#[from] PostprocessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Loaded,
  Closed,
}

/// 单次 `predict` 的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
  /// 当前帧的最高类别
  pub class: ClassId,
  pub label: String,
  /// 当前帧最高类别的置信度
  pub confidence: f32,
  /// 会话内累计出现次数最多的类别
  pub most_frequent_class: ClassId,
  pub most_frequent_label: String,
}

/// 推理引擎与预测历史的所有者。
///
/// 创建时立即加载模型；`close` 之后任何 `predict` 都返回 [`SessionError::Closed`]。
#[derive(Debug)]
pub struct Session {
  engine: EngineHandle,
  builder: ClassifierTensorBuilder,
  labels: LabelTable,
  aggregator: TemporalAggregator,
  state: SessionState,
}

impl Session {
  pub fn create<R: Runtime>(
    runtime: &R,
    model: &[u8],
    labels: LabelTable,
  ) -> Result<Self, SessionError> {
    let engine = EngineHandle::load(runtime, model)?;
    info!("预测会话已创建");

    Ok(Self {
      engine,
      builder: ClassifierTensorBuilder::new(),
      labels,
      aggregator: TemporalAggregator::new(),
      state: SessionState::Loaded,
    })
  }

  pub fn predict(&mut self, image: &RawImage) -> Result<Prediction, SessionError> {
    if self.state == SessionState::Closed {
      warn!("会话已关闭，拒绝推理");
      return Err(SessionError::Closed);
    }

    let now = Instant::now();
    let tensor = self.builder.build(image)?;
    let logits = self.engine.run(&tensor)?;
    let top = postprocess::top_class(logits.as_slice())?;

    // 所有步骤成功后才写入历史
    self.aggregator.record(PredictionRecord::from(top));
    let most_frequent_class = self.aggregator.most_frequent().unwrap_or(top.class);

    let prediction = Prediction {
      class: top.class,
      label: self.labels.label(top.class).to_string(),
      confidence: top.confidence,
      most_frequent_class,
      most_frequent_label: self.labels.label(most_frequent_class).to_string(),
    };
    debug!(
      "预测完成，耗时: {:.2?}, 当前: {} ({:.2}%), 累计: {}",
      now.elapsed(),
      prediction.label,
      prediction.confidence * 100.0,
      prediction.most_frequent_label
    );

    Ok(prediction)
  }

  /// 释放推理引擎并进入终止状态，重复调用无副作用
  pub fn close(&mut self) {
    if self.state == SessionState::Closed {
      return;
    }
    self.engine.release();
    self.state = SessionState::Closed;
    info!("预测会话已关闭，共处理 {} 帧", self.aggregator.len());
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn is_closed(&self) -> bool {
    self.state == SessionState::Closed
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn history(&self) -> &TemporalAggregator {
    &self.aggregator
  }
}

impl Model for Session {
  type Input = RawImage;
  type Output = Prediction;
  type Error = SessionError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.predict(input)
  }
}

/// 可跨线程共享的会话，`predict` 在互斥锁内串行执行
#[derive(Debug)]
pub struct SharedSession {
  inner: Mutex<Session>,
}

impl SharedSession {
  pub fn new(session: Session) -> Self {
    Self {
      inner: Mutex::new(session),
    }
  }

  pub fn predict(&self, image: &RawImage) -> Result<Prediction, SessionError> {
    let mut session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
    session.predict(image)
  }

  pub fn close(&self) -> Result<(), SessionError> {
    let mut session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
    session.close();
    Ok(())
  }

  pub fn is_closed(&self) -> Result<bool, SessionError> {
    let session = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
    Ok(session.is_closed())
  }

  pub fn into_inner(self) -> Result<Session, SessionError> {
    self.inner.into_inner().map_err(|_| SessionError::Poisoned)
  }
}

impl From<Session> for SharedSession {
  fn from(session: Session) -> Self {
    SharedSession::new(session)
  }
}

impl Model for SharedSession {
  type Input = RawImage;
  type Output = Prediction;
  type Error = SessionError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.predict(input)
  }
}
