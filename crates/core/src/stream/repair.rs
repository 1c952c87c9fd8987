use super::TagMarkers;

/// Close tags the model left dangling and drop trailing whitespace.
///
/// An opening marker that starts while another tag is still open closes the
/// previous tag first; a tag still open at the end is closed with the
/// matching marker. Accepts both marker families of [`TagMarkers::default`].
pub fn balance_tags(text: &str) -> String {
  let markers = TagMarkers::default();
  let mut out = String::with_capacity(text.len() + 3);
  let mut open: Option<char> = None;

  for c in text.trim_end().chars() {
    if let Some(at) = markers.open.iter().position(|m| *m == c) {
      if let Some(close) = open.take() {
        out.push(close);
      }
      open = markers.close.get(at).copied();
    } else if markers.close.contains(&c) {
      open = None;
    }
    out.push(c);
  }

  if let Some(close) = open {
    out.push(close);
  }
  out
}
