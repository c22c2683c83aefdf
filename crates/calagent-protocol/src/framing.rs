//! Newline-delimited message framing for the stdio transport.
//!
//! Each message is a single line of compact JSON:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"ping"}\n
//! ```
//!
//! Compact `serde_json` output never contains a raw newline, so no
//! escaping is needed.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message as one line, including the trailing `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut line = serde_json::to_vec(message)?;

    if line.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: line.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    line.push(b'\n');
    Ok(line)
}

/// Reads newline-delimited messages from a buffered stream.
pub struct LineReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Reads the next non-blank line, without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream. A final line without a trailing
    /// newline is still returned. Oversized lines are consumed and reported
    /// as [`ProtocolError::MessageTooLarge`] so the caller can keep reading.
    /// At most `MAX_MESSAGE_SIZE + 1` bytes of a line are ever buffered.
    pub async fn read_line(&mut self) -> ProtocolResult<Option<String>> {
        loop {
            self.buffer.clear();
            let n = (&mut self.reader)
                .take(MAX_MESSAGE_SIZE as u64 + 1)
                .read_until(b'\n', &mut self.buffer)
                .await?;
            if n == 0 {
                return Ok(None);
            }

            if self.buffer.len() > MAX_MESSAGE_SIZE {
                let mut size = self.buffer.len();
                if self.buffer.last() != Some(&b'\n') {
                    size += self.discard_line().await?;
                }
                self.buffer.clear();
                return Err(ProtocolError::MessageTooLarge {
                    size,
                    max: MAX_MESSAGE_SIZE,
                });
            }

            let line = std::str::from_utf8(&self.buffer)
                .map_err(|_| ProtocolError::InvalidUtf8)?
                .trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Skips the rest of the current line without buffering it.
    ///
    /// Returns the number of bytes skipped, terminator included.
    async fn discard_line(&mut self) -> ProtocolResult<usize> {
        let mut skipped = 0;
        loop {
            let (consumed, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(skipped);
                }
                match available.iter().position(|b| *b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            skipped += consumed;
            if done {
                return Ok(skipped);
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes newline-delimited messages, flushing after each one.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let line = encode_line(message)?;
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonRpcResponse;
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn encode_appends_single_newline() {
        let line = encode_line(&json!({"jsonrpc": "2.0", "id": 1, "result": {}})).unwrap();
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
        assert_eq!(line.last(), Some(&b'\n'));
    }

    #[test]
    fn encode_escapes_embedded_newlines() {
        let line = encode_line(&json!({"text": "Free slots:\n00:00 - 23:59"})).unwrap();
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[tokio::test]
    async fn reads_lines_and_skips_blanks() {
        let input = b"{\"a\":1}\n\n   \r\n{\"b\":2}\r\n{\"c\":3}";
        let mut reader = LineReader::new(BufReader::new(&input[..]));

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("{\"b\":2}"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("{\"c\":3}"));
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_stream_is_eof() {
        let mut reader = LineReader::new(BufReader::new(&b""[..]));
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_line_is_skipped() {
        let mut input = vec![b'x'; MAX_MESSAGE_SIZE + 10];
        input.extend_from_slice(b"\n{\"ok\":true}\n");
        let mut reader = LineReader::new(BufReader::new(&input[..]));

        assert!(matches!(
            reader.read_line().await,
            Err(ProtocolError::MessageTooLarge { .. })
        ));
        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("{\"ok\":true}")
        );
    }

    #[tokio::test]
    async fn oversized_line_is_not_buffered_whole() {
        let mut input = vec![b'y'; MAX_MESSAGE_SIZE * 3];
        input.extend_from_slice(b"\n{\"next\":1}\n");
        let mut reader = LineReader::new(BufReader::new(&input[..]));

        match reader.read_line().await {
            Err(ProtocolError::MessageTooLarge { size, max }) => {
                assert_eq!(size, MAX_MESSAGE_SIZE * 3 + 1);
                assert_eq!(max, MAX_MESSAGE_SIZE);
            }
            other => panic!("expected MessageTooLarge, got {:?}", other),
        }
        assert!(reader.buffer.capacity() <= 2 * (MAX_MESSAGE_SIZE + 1));
        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("{\"next\":1}")
        );
    }

    #[tokio::test]
    async fn unterminated_oversized_line_reaches_eof() {
        let input = vec![b'z'; MAX_MESSAGE_SIZE + 5];
        let mut reader = LineReader::new(BufReader::new(&input[..]));

        assert!(matches!(
            reader.read_line().await,
            Err(ProtocolError::MessageTooLarge { size, .. }) if size == MAX_MESSAGE_SIZE + 5
        ));
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writer_emits_one_line_per_message() {
        let mut writer = LineWriter::new(Vec::new());
        writer
            .write_message(&JsonRpcResponse::success(json!(1), json!({})))
            .await
            .unwrap();
        writer
            .write_message(&JsonRpcResponse::success(json!(2), json!({})))
            .await
            .unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        insta::assert_snapshot!(out.trim_end(), @r#"
        {"jsonrpc":"2.0","id":1,"result":{}}
        {"jsonrpc":"2.0","id":2,"result":{}}
        "#);
    }
}
