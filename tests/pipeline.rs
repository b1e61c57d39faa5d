// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 输入、任务与输出的端到端测试
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

mod common;

use std::{cell::RefCell, convert::Infallible};

use common::{ChannelMeanRuntime, labels};
use image::{Rgb, RgbImage};
use shanan_classify::{
  FromUrl, RawImage, Session,
  input::ImageFileInput,
  model::LabelTable,
  output::{OutputWrapper, Render},
  session::Prediction,
  task::{ContinuousTask, OneShotTask, Task},
  tensor,
};

#[derive(Default)]
struct Collect(RefCell<Vec<Prediction>>);

impl Render<RawImage, Prediction> for &Collect {
  type Error = Infallible;

  fn render_result(&self, _frame: &RawImage, result: &Prediction) -> Result<(), Infallible> {
    self.0.borrow_mut().push(result.clone());
    Ok(())
  }
}

fn write_png(dir: &std::path::Path, name: &str, rgb: [u8; 3]) {
  RgbImage::from_pixel(40, 30, Rgb(rgb))
    .save(dir.join(name))
    .unwrap();
}

#[test]
fn directory_input_feeds_continuous_task() {
  let dir = tempfile::tempdir().unwrap();
  write_png(dir.path(), "a.png", [240, 0, 0]);
  write_png(dir.path(), "b.png", [0, 0, 240]);
  write_png(dir.path(), "c.png", [0, 0, 240]);
  std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

  let url = url::Url::parse(&format!("image://{}", dir.path().display())).unwrap();
  let input = ImageFileInput::from_url(&url).unwrap();
  assert_eq!(input.remaining(), 3);

  let session = Session::create(&ChannelMeanRuntime, b"channel-mean", labels()).unwrap();
  let sink = Collect::default();
  let report = ContinuousTask::default()
    .run_task(input, session, &sink)
    .unwrap();
  assert_eq!(report.frames, 3);

  let labels: Vec<(String, String)> = sink
    .0
    .borrow()
    .iter()
    .map(|p| (p.label.clone(), p.most_frequent_label.clone()))
    .collect();
  assert_eq!(
    labels,
    vec![
      ("cat".to_string(), "cat".to_string()),
      ("bird".to_string(), "cat".to_string()),
      ("bird".to_string(), "bird".to_string()),
    ]
  );
}

#[test]
fn repeated_single_file_input() {
  let dir = tempfile::tempdir().unwrap();
  write_png(dir.path(), "g.png", [0, 200, 0]);

  let url = url::Url::parse(&format!(
    "image://{}?repeat=4",
    dir.path().join("g.png").display()
  ))
  .unwrap();
  let input = ImageFileInput::from_url(&url).unwrap();
  assert_eq!(input.remaining(), 4);

  let images: Vec<RawImage> = input.collect();
  assert_eq!(images.len(), 4);
  assert_eq!((images[0].width(), images[0].height()), (40, 30));
  let tensor = tensor::build(&images[0]).unwrap();
  assert_eq!(&tensor.as_slice()[..3], &[0.0, 200.0, 0.0]);
}

#[test]
fn undecodable_files_are_reported_as_skipped() {
  let dir = tempfile::tempdir().unwrap();
  write_png(dir.path(), "a.png", [240, 0, 0]);
  std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();
  write_png(dir.path(), "c.png", [0, 240, 0]);

  let mut input = ImageFileInput::open(dir.path()).unwrap();
  assert_eq!(input.remaining(), 3);

  let images: Vec<RawImage> = input.by_ref().collect();
  assert_eq!(images.len(), 2);
  assert_eq!(input.skipped(), [dir.path().join("b.png")]);
}

#[test]
fn input_rejects_missing_and_empty_sources() {
  let dir = tempfile::tempdir().unwrap();
  assert!(ImageFileInput::open(dir.path()).is_err());
  assert!(ImageFileInput::open(dir.path().join("missing.png")).is_err());

  let url = url::Url::parse("video:///dev/video0").unwrap();
  assert!(ImageFileInput::from_url(&url).is_err());
}

#[test]
fn one_shot_with_log_output() {
  let dir = tempfile::tempdir().unwrap();
  write_png(dir.path(), "only.png", [0, 0, 255]);
  let input = ImageFileInput::open(dir.path().join("only.png")).unwrap();

  let session = Session::create(&ChannelMeanRuntime, b"channel-mean", labels()).unwrap();
  let output = OutputWrapper::from_url(&url::Url::parse("log://").unwrap()).unwrap();
  let report = OneShotTask.run_task(input, session, output).unwrap();
  assert_eq!(report.frames, 1);

  assert!(OutputWrapper::from_url(&url::Url::parse("rtsp://host/stream").unwrap()).is_err());
}

#[test]
fn labels_load_from_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("labels.toml");
  std::fs::write(
    &path,
    "labels = [\"a\", \"b\", \"c\", \"d\", \"e\", \"f\", \"g\", \"h\"]\n",
  )
  .unwrap();

  let table = LabelTable::from_path(&path).unwrap();
  assert_eq!(table.iter().map(|(_, l)| l).collect::<String>(), "abcdefgh");
  assert!(LabelTable::from_path(dir.path().join("nope.toml")).is_err());
}
