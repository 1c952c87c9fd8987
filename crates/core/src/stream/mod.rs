mod gate;
pub use gate::{ReadyGate, ReadyGates};

mod repair;
pub use repair::balance_tags;

mod scanner;
pub use scanner::{TagMarkers, TagScanner, Tail};

use std::{fmt, sync::Arc};

use anyhow::anyhow;
use futures::{Stream, StreamExt};
use lingchat_shared::AppError;
use tokio::sync::mpsc;

/// One ordered unit of generated text.
#[derive(Debug, Clone)]
pub struct Segment {
  pub text: String,
  pub sequence_index: usize,
  pub is_final: bool,
  pub gate: ReadyGate,
}

/// Clean-up applied to the terminal segment and to the full response.
pub type TextRepair = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Turns a chunked model response into tagged segments on a bounded queue.
///
/// A segmenter is consumed by the one response stream it runs over, so its
/// gate table only ever holds that response's gates. Segments are sent in
/// strictly increasing `sequence_index` order starting at 0; a full queue
/// suspends the segmenter (and with it the upstream generation).
#[derive(Default)]
pub struct StreamSegmenter {
  markers: TagMarkers,
  repair: Option<TextRepair>,
  gates: ReadyGates,
}

impl fmt::Debug for StreamSegmenter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StreamSegmenter")
      .field("markers", &self.markers)
      .field("repair", &self.repair.is_some())
      .field("gates", &self.gates.len())
      .finish()
  }
}

impl StreamSegmenter {
  pub fn new(markers: TagMarkers) -> Self {
    Self {
      markers,
      ..Self::default()
    }
  }

  #[must_use]
  pub fn with_repair(mut self, repair: TextRepair) -> Self {
    self.repair = Some(repair);
    self
  }

  /// Gate table shared with whoever needs per-segment acknowledgement.
  pub fn gates(&self) -> ReadyGates {
    self.gates.clone()
  }

  /// Consume `stream` until exhaustion, sending every segment to `sender`.
  ///
  /// Returns the concatenation of all chunks. An upstream error is returned
  /// after the segments completed before it have been sent; no terminal
  /// segment is produced in that case.
  pub async fn run<S>(self, mut stream: S, sender: &mpsc::Sender<Segment>) -> Result<String, AppError>
  where
    S: Stream<Item = Result<String, AppError>> + Unpin,
  {
    let mut scanner = TagScanner::new(self.markers);
    let mut accumulated = String::new();
    let mut next_index = 0;

    while let Some(chunk) = stream.next().await {
      let chunk = chunk.inspect_err(|err| {
        tracing::warn!(error = %err, emitted = next_index, "response stream failed");
      })?;
      tracing::trace!(chunk = %chunk, "response chunk");

      accumulated.push_str(&chunk);
      for text in scanner.push(&chunk) {
        self.emit(sender, &mut next_index, text, false).await?;
      }
    }

    match scanner.finish() {
      None => {}
      Some(Tail::Closed(text)) => self.emit(sender, &mut next_index, text, false).await?,
      Some(Tail::Open(text)) => {
        let text = self.repair(&text);
        accumulated = self.repair(&accumulated);
        self.emit(sender, &mut next_index, text, true).await?;
      }
    }

    tracing::debug!(segments = next_index, chars = accumulated.chars().count(), "response segmented");
    Ok(accumulated)
  }

  fn repair(&self, text: &str) -> String {
    match &self.repair {
      Some(repair) => repair(text),
      None => text.to_owned(),
    }
  }

  async fn emit(
    &self,
    sender: &mpsc::Sender<Segment>,
    next_index: &mut usize,
    text: String,
    is_final: bool,
  ) -> Result<(), AppError> {
    let sequence_index = *next_index;
    let segment = Segment {
      text,
      sequence_index,
      is_final,
      gate: self.gates.create(sequence_index),
    };

    sender
      .send(segment)
      .await
      .map_err(|_| anyhow!("segment consumer dropped at index {sequence_index}"))?;
    *next_index += 1;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use futures::stream;

  use super::*;

  async fn segment_chunks(
    segmenter: StreamSegmenter,
    chunks: Vec<Result<String, AppError>>,
  ) -> (Vec<Segment>, Result<String, AppError>) {
    let (tx, mut rx) = mpsc::channel(64);
    let result = segmenter.run(stream::iter(chunks), &tx).await;
    drop(tx);

    let mut segments = Vec::new();
    while let Some(segment) = rx.recv().await {
      segments.push(segment);
    }
    (segments, result)
  }

  async fn segment_text(chunks: &[&str]) -> Vec<(String, usize, bool)> {
    let chunks = chunks.iter().map(|c| Ok((*c).to_owned())).collect();
    let (segments, result) = segment_chunks(StreamSegmenter::default(), chunks).await;
    assert!(result.is_ok());
    segments
      .into_iter()
      .map(|s| (s.text, s.sequence_index, s.is_final))
      .collect()
  }

  fn assert_well_ordered(segments: &[(String, usize, bool)]) {
    for (expected, (_, index, _)) in segments.iter().enumerate() {
      assert_eq!(*index, expected);
    }
    let finals = segments.iter().filter(|(_, _, is_final)| *is_final).count();
    assert!(finals <= 1);
    if finals == 1 {
      assert!(segments.last().is_some_and(|(_, _, is_final)| *is_final));
    }
  }

  #[tokio::test]
  async fn untagged_text_is_one_final_segment() {
    let segments = segment_text(&["Hello world"]).await;
    assert_eq!(segments, vec![("Hello world".to_owned(), 0, true)]);
  }

  #[tokio::test]
  async fn numeric_tags_without_trailing_remainder() {
    let segments = segment_text(&["【1】Hi【2】Bye"]).await;
    assert_eq!(
      segments,
      vec![
        ("【1】Hi".to_owned(), 0, false),
        ("【2】Bye".to_owned(), 1, false),
      ]
    );
  }

  #[tokio::test]
  async fn emotion_tags_end_with_a_final_segment() {
    let segments = segment_text(&["【高兴】你好呀（摇尾巴）", "【害羞】", "嗯……"]).await;
    assert_eq!(
      segments,
      vec![
        ("【高兴】你好呀（摇尾巴）".to_owned(), 0, false),
        ("【害羞】嗯……".to_owned(), 1, true),
      ]
    );
  }

  #[tokio::test]
  async fn chunk_boundaries_do_not_change_the_output() {
    let inputs = [
      "【1】Hi【2】Bye",
      "前言【1】你好【23】再见【4】",
      "[1]one[2]two[3]",
      "【1】a【x】b【2】c",
      "no tags at all",
      "【1】unfinished【2",
    ];

    for input in inputs {
      let whole = segment_text(&[input]).await;
      assert_well_ordered(&whole);

      let cuts: Vec<usize> = input.char_indices().map(|(i, _)| i).skip(1).collect();
      for (n, &first) in cuts.iter().enumerate() {
        let split = segment_text(&[&input[..first], &input[first..]]).await;
        assert_eq!(split, whole, "input {input:?} split at {first}");

        for &second in &cuts[n + 1..] {
          let split = segment_text(&[&input[..first], &input[first..second], &input[second..]]).await;
          assert_eq!(split, whole, "input {input:?} split at {first}/{second}");
        }
      }
    }
  }

  #[tokio::test]
  async fn char_by_char_stream_matches_single_chunk() {
    let input = "【1】你好【2】今天天气不错【3】再见";
    let chars: Vec<String> = input.chars().map(String::from).collect();
    let chars: Vec<&str> = chars.iter().map(String::as_str).collect();
    assert_eq!(segment_text(&chars).await, segment_text(&[input]).await);
  }

  #[tokio::test]
  async fn upstream_error_is_returned_after_completed_segments() {
    let chunks = vec![
      Ok("【1】a【2】b".to_owned()),
      Ok("【3】".to_owned()),
      Err(AppError::new(anyhow!("connection reset"))),
    ];
    let (segments, result) = segment_chunks(StreamSegmenter::default(), chunks).await;

    assert!(result.is_err());
    let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["【1】a", "【2】b"]);
    assert!(segments.iter().all(|s| !s.is_final));
  }

  #[tokio::test]
  async fn repair_applies_to_terminal_segment_and_response() {
    let segmenter = StreamSegmenter::default().with_repair(Arc::new(|text: &str| text.replace("...", "…")));
    let chunks = vec![Ok("【1】ok【smile】well...".to_owned())];
    let (segments, result) = segment_chunks(segmenter, chunks).await;

    assert_eq!(segments[0].text, "【1】ok");
    assert_eq!(segments[1].text, "【smile】well…");
    assert!(segments[1].is_final);
    assert_eq!(result.ok().as_deref(), Some("【1】ok【smile】well…"));
  }

  #[tokio::test]
  async fn every_segment_gets_a_registered_gate() {
    let segmenter = StreamSegmenter::default();
    let gates = segmenter.gates();
    let chunks = vec![Ok("【1】a【2】b【3】c".to_owned())];
    let (segments, _) = segment_chunks(segmenter, chunks).await;

    assert_eq!(gates.len(), segments.len());
    segments[1].gate.signal();
    assert!(gates.get(1).is_some_and(|g| g.is_signaled()));
    assert!(gates.get(0).is_some_and(|g| !g.is_signaled()));
  }

  #[tokio::test]
  async fn bounded_queue_is_drained_concurrently() {
    let segmenter = StreamSegmenter::default();
    let (tx, mut rx) = mpsc::channel::<Segment>(1);
    let consumer = tokio::spawn(async move {
      let mut indices = Vec::new();
      while let Some(segment) = rx.recv().await {
        segment.gate.signal();
        indices.push(segment.sequence_index);
      }
      indices
    });

    let input: String = (1..=20).map(|i| format!("【{i}】line {i}")).collect();
    let response = segmenter
      .run(stream::iter(vec![Ok(input.clone())]), &tx)
      .await
      .expect("segmentation should succeed");
    drop(tx);

    assert_eq!(response, input);
    assert_eq!(consumer.await.expect("consumer should finish"), (0..20).collect::<Vec<_>>());
  }

  #[tokio::test]
  async fn dropped_consumer_aborts_the_run() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let result = StreamSegmenter::default()
      .run(stream::iter(vec![Ok("plain".to_owned())]), &tx)
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn gate_table_holds_only_its_own_response() {
    let first = StreamSegmenter::default();
    let first_gates = first.gates();
    let (first_segments, _) = segment_chunks(first, vec![Ok("【1】a【2】b".to_owned())]).await;

    let second = StreamSegmenter::default();
    let second_gates = second.gates();
    let (second_segments, _) = segment_chunks(second, vec![Ok("【1】c".to_owned())]).await;

    first_segments[0].gate.signal();
    assert_eq!(first_gates.len(), 2);
    assert_eq!(second_gates.len(), 1);
    assert!(first_gates.get(0).is_some_and(|g| g.is_signaled()));
    assert!(second_gates.get(0).is_some_and(|g| !g.is_signaled()));
    assert!(!second_segments[0].gate.is_signaled());
  }
}
