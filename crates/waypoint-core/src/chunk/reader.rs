//! Bounded, delimiter-aligned reads from large inputs.
//!
//! `read_chunk` reads `step` bytes starting at `offset` and trims everything
//! after the last delimiter in that window, so every chunk ends on a record
//! boundary and the returned `next_offset` points at the start of the first
//! record not yet returned.
//!
//! ```text
//! file: "Foo\nBar\nBaz\n"
//! read_chunk(file, 0, 5)  -> (4,  "Foo\n")
//! read_chunk(file, 4, 10) -> (12, "Bar\nBaz\n")
//! read_chunk(file, 12, 5) -> (12, "")           end of input
//! ```
//!
//! When a full window holds no delimiter, the read is extended by further
//! `step`-sized pieces until a delimiter or the end of input shows up, so a
//! record longer than `step` is returned whole in one chunk. Only the final
//! unterminated record of a file is returned without a trailing delimiter.

use std::io::SeekFrom;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// One delimiter-aligned read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Offset to continue reading from.
    pub next_offset: u64,
    /// Decoded content; empty once the end of input has been reached.
    pub content: String,
}

impl Chunk {
    pub fn is_end(&self) -> bool {
        self.content.is_empty()
    }
}

/// Errors from chunked reads.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk at offset {offset} is not valid UTF-8")]
    Decode { offset: u64 },

    #[error("read size must be at least one byte")]
    ZeroStep,

    #[error("record delimiter {0:?} must be a single ASCII character")]
    Delimiter(char),
}

/// Read the next delimiter-aligned chunk of `path` starting at `offset`.
pub async fn read_chunk(
    path: &Path,
    offset: u64,
    step: u64,
    delimiter: char,
) -> Result<Chunk, ChunkError> {
    if step == 0 {
        return Err(ChunkError::ZeroStep);
    }
    if !delimiter.is_ascii() {
        return Err(ChunkError::Delimiter(delimiter));
    }

    let io_err = |source| ChunkError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;

    let delimiter = delimiter as u8;
    let mut window = Vec::with_capacity(step.min(64 * 1024) as usize);
    loop {
        let start = window.len();
        let read = (&mut file)
            .take(step)
            .read_to_end(&mut window)
            .await
            .map_err(io_err)?;
        let at_end = (read as u64) < step;
        if at_end || window[start..].contains(&delimiter) {
            break;
        }
    }

    let (next_offset, kept) = align_to_delimiter(&window, offset, delimiter);
    let content = std::str::from_utf8(kept)
        .map_err(|_| ChunkError::Decode { offset })?
        .to_string();

    tracing::trace!(
        path = %path.display(),
        offset,
        next_offset,
        bytes = kept.len(),
        "read chunk"
    );

    Ok(Chunk {
        next_offset,
        content,
    })
}

/// Trim `window` (read from `offset`) to end just after its last `delimiter`.
///
/// Returns the next offset and the kept prefix. An empty window yields
/// `(offset, [])`; a window without any delimiter is kept whole, which is
/// only correct once the window reaches the end of input.
pub fn align_to_delimiter(window: &[u8], offset: u64, delimiter: u8) -> (u64, &[u8]) {
    if window.is_empty() {
        return (offset, window);
    }
    let keep = match window.iter().rposition(|b| *b == delimiter) {
        Some(pos) => pos + 1,
        None => window.len(),
    };
    (offset + keep as u64, &window[..keep])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn align_trims_after_last_delimiter() {
        let (next, kept) = align_to_delimiter(b"Foo\nBa", 0, b'\n');
        assert_eq!(next, 4);
        assert_eq!(kept, b"Foo\n");
    }

    #[test]
    fn align_keeps_window_ending_on_delimiter() {
        let (next, kept) = align_to_delimiter(b"Bar\nBaz\n", 4, b'\n');
        assert_eq!(next, 12);
        assert_eq!(kept, b"Bar\nBaz\n");
    }

    #[test]
    fn align_without_delimiter_keeps_final_record() {
        let (next, kept) = align_to_delimiter(b"Qux", 16, b'\n');
        assert_eq!(next, 19);
        assert_eq!(kept, b"Qux");
    }

    #[test]
    fn align_empty_window_is_end_of_input() {
        let (next, kept) = align_to_delimiter(b"", 9, b'\n');
        assert_eq!(next, 9);
        assert!(kept.is_empty());
    }

    #[tokio::test]
    async fn reads_follow_record_boundaries() {
        let file = fixture("Foo\nBar\nBaz\nQux\n");

        let first = read_chunk(file.path(), 0, 5, '\n').await.unwrap();
        assert_eq!(first, Chunk { next_offset: 4, content: "Foo\n".to_string() });

        let second = read_chunk(file.path(), first.next_offset, 10, '\n').await.unwrap();
        assert_eq!(second.content, "Bar\nBaz\n");
        assert_eq!(second.next_offset, 12);

        let third = read_chunk(file.path(), second.next_offset, 10, '\n').await.unwrap();
        assert_eq!(third.content, "Qux\n");

        let end = read_chunk(file.path(), third.next_offset, 10, '\n').await.unwrap();
        assert!(end.is_end());
        assert_eq!(end.next_offset, third.next_offset);
    }

    #[tokio::test]
    async fn unterminated_last_record_is_returned() {
        let file = fixture("a\nb");
        let first = read_chunk(file.path(), 0, 64, '\n').await.unwrap();
        assert_eq!(first.content, "a\n");
        let last = read_chunk(file.path(), first.next_offset, 64, '\n').await.unwrap();
        assert_eq!(last.content, "b");
        assert!(read_chunk(file.path(), last.next_offset, 64, '\n').await.unwrap().is_end());
    }

    #[tokio::test]
    async fn record_longer_than_step_is_read_whole() {
        let content = "company,gender\nAcmeIncorporatedHoldings,Male\nB,Female\n";
        let file = fixture(content);

        let header = read_chunk(file.path(), 0, 16, '\n').await.unwrap();
        assert_eq!(header.content, "company,gender\n");

        let long = read_chunk(file.path(), header.next_offset, 16, '\n').await.unwrap();
        assert_eq!(long.content, "AcmeIncorporatedHoldings,Male\n");

        let rest = read_chunk(file.path(), long.next_offset, 16, '\n').await.unwrap();
        assert_eq!(rest.content, "B,Female\n");
        assert_eq!(rest.next_offset, content.len() as u64);
    }

    #[tokio::test]
    async fn long_unterminated_record_is_read_to_the_end() {
        let file = fixture("a\nbbbbbbbbbbbbbbbbbbbb");
        let first = read_chunk(file.path(), 0, 4, '\n').await.unwrap();
        assert_eq!(first.content, "a\n");
        let last = read_chunk(file.path(), first.next_offset, 4, '\n').await.unwrap();
        assert_eq!(last.content, "b".repeat(20));
        assert!(read_chunk(file.path(), last.next_offset, 4, '\n').await.unwrap().is_end());
    }

    #[tokio::test]
    async fn multibyte_text_is_never_cut_mid_character() {
        let file = fixture("héllo wörld\nçà\n");
        let chunk = read_chunk(file.path(), 0, 3, '\n').await.unwrap();
        assert_eq!(chunk.content, "héllo wörld\n");
    }

    #[tokio::test]
    async fn custom_delimiter() {
        let file = fixture("x;y;z");
        let chunk = read_chunk(file.path(), 0, 4, ';').await.unwrap();
        assert_eq!(chunk.content, "x;y;");
        assert_eq!(chunk.next_offset, 4);
    }

    #[tokio::test]
    async fn rejects_zero_step_and_non_ascii_delimiter() {
        let file = fixture("abc");
        assert!(matches!(
            read_chunk(file.path(), 0, 0, '\n').await,
            Err(ChunkError::ZeroStep)
        ));
        assert!(matches!(
            read_chunk(file.path(), 0, 4, 'é').await,
            Err(ChunkError::Delimiter('é'))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_chunk(&dir.path().join("absent.csv"), 0, 8, '\n')
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.csv"));
    }
}
