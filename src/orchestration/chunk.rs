//! Text chunking for streamed responses

use crate::domain::StreamEvent;

/// Split text into `text_delta` events of at most `chunk_size` characters
///
/// Chunks are consecutive, non-overlapping, and preserve content and order
/// exactly; boundaries are counted in characters so a multi-byte scalar is
/// never split. Empty text yields zero events; text shorter than
/// `chunk_size` yields exactly one. The iterator is pure, restartable, and
/// finite.
pub fn stream_text_in_chunks(
    text: &str,
    chunk_size: usize,
) -> impl Iterator<Item = StreamEvent> + '_ {
    let size = chunk_size.max(1);
    let mut rest = text;

    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        let split = rest
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split);
        rest = tail;

        Some(StreamEvent::text_delta(head))
    })
}
