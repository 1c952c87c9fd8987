/// Opening and closing characters of a segment tag such as `【2】` or `[happy]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMarkers {
  pub open: &'static [char],
  pub close: &'static [char],
}

impl TagMarkers {
  pub const FULLWIDTH: Self = Self {
    open: &['【'],
    close: &['】'],
  };

  pub const ASCII: Self = Self {
    open: &['['],
    close: &[']'],
  };
}

impl Default for TagMarkers {
  /// Accepts both `【…】` and `[…]`.
  fn default() -> Self {
    Self {
      open: &['【', '['],
      close: &['】', ']'],
    }
  }
}

/// What is left in the buffer once the stream is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tail {
  /// A closed numeric tag with its trailing prose: a regular segment.
  Closed(String),
  /// Untagged prose, an unclosed tag or a non-numeric tag: the terminal segment.
  Open(String),
}

/// Incremental tag scanner over a buffer retained across chunks.
///
/// A segment is cut in front of an opening marker once the preceding tag has
/// been closed, so a segment is only ever produced after the text that ends it
/// has arrived. The output therefore does not depend on how the input was split
/// into chunks.
#[derive(Debug, Clone, Default)]
pub struct TagScanner {
  markers: TagMarkers,
  buffer: String,
}

impl TagScanner {
  pub fn new(markers: TagMarkers) -> Self {
    Self {
      markers,
      buffer: String::new(),
    }
  }

  /// Feed a chunk, returning every segment it completed, in order.
  pub fn push(&mut self, chunk: &str) -> Vec<String> {
    self.buffer.push_str(chunk);

    let mut completed = Vec::new();
    while let Some(end) = self.next_boundary() {
      completed.push(self.buffer.drain(..end).collect());
    }
    completed
  }

  /// Text retained for the next chunk.
  pub fn pending(&self) -> &str {
    &self.buffer
  }

  pub fn finish(self) -> Option<Tail> {
    if self.buffer.is_empty() {
      return None;
    }

    Some(if self.starts_with_numeric_tag() {
      Tail::Closed(self.buffer)
    } else {
      Tail::Open(self.buffer)
    })
  }

  /// Byte offset of the opening marker that ends the current segment.
  fn next_boundary(&self) -> Option<usize> {
    let buffer = self.buffer.as_str();

    let open_at = buffer.find(self.markers.open)?;
    let tag_start = open_at + char_len_at(buffer, open_at);
    let close_at = tag_start + buffer[tag_start..].find(self.markers.close)?;
    let prose_start = close_at + char_len_at(buffer, close_at);
    let next_open = buffer[prose_start..].find(self.markers.open)?;

    Some(prose_start + next_open)
  }

  fn starts_with_numeric_tag(&self) -> bool {
    let Some(open_at) = self.buffer.find(self.markers.open) else {
      return false;
    };
    let rest = &self.buffer[open_at + char_len_at(&self.buffer, open_at)..];
    let digits: usize = rest
      .chars()
      .take_while(|c| is_tag_digit(*c))
      .map(char::len_utf8)
      .sum();

    digits > 0 && rest[digits..].starts_with(self.markers.close)
  }
}

fn char_len_at(text: &str, index: usize) -> usize {
  text[index..].chars().next().map_or(0, char::len_utf8)
}

fn is_tag_digit(c: char) -> bool {
  c.is_ascii_digit() || ('０'..='９').contains(&c)
}
