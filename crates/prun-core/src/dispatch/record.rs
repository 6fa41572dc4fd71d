use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// How input records are delimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Separator {
    #[default]
    Newline,
    Nul,
}

impl Separator {
    #[inline]
    pub fn byte(&self) -> u8 {
        match self {
            Separator::Newline => b'\n',
            Separator::Nul => b'\0',
        }
    }
}

/// Splits a byte stream into records.
///
/// The separator is stripped; in newline mode a trailing `\r` is stripped as well.
/// A final record without a separator is still returned.
pub struct RecordReader<R> {
    inner: BufReader<R>,
    sep: Separator,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(reader: R, sep: Separator) -> Self {
        Self {
            inner: BufReader::new(reader),
            sep,
            buf: Vec::with_capacity(256),
        }
    }

    /// Next raw record, or `None` at end of input. Bytes are passed through undecoded.
    pub async fn next_record(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.buf.clear();
        let n = self.inner.read_until(self.sep.byte(), &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }

        let mut raw = self.buf.as_slice();
        if let Some(rest) = raw.strip_suffix(&[self.sep.byte()]) {
            raw = rest;
        }
        if self.sep == Separator::Newline
            && let Some(rest) = raw.strip_suffix(b"\r")
        {
            raw = rest;
        }
        Ok(Some(raw.to_vec()))
    }
}

/// Trim a record for use as a job: surrounding whitespace and stray NUL bytes go.
///
/// UTF-8 records are trimmed of Unicode whitespace, anything else of ASCII whitespace only.
/// Returns `None` for records that are blank after trimming.
pub fn normalize(record: &[u8]) -> Option<&[u8]> {
    let trimmed = match std::str::from_utf8(record) {
        Ok(text) => text
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .as_bytes(),
        Err(_) => trim_ascii(record),
    };
    (!trimmed.is_empty()).then_some(trimmed)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let junk = |b: &u8| b.is_ascii_whitespace() || *b == b'\0' || *b == 0x0b;
    let start = bytes.iter().position(|b| !junk(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !junk(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn records(input: &'static [u8], sep: Separator) -> Vec<String> {
        let mut reader = RecordReader::new(input, sep);
        let mut out = Vec::new();
        while let Some(rec) = reader.next_record().await.unwrap() {
            out.push(String::from_utf8(rec).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn splits_null_separated_values() {
        assert_eq!(
            records(b"foo\0bar\0baz", Separator::Nul).await,
            vec!["foo", "bar", "baz"]
        );
        assert_eq!(records(b"foo\0", Separator::Nul).await, vec!["foo"]);
        assert_eq!(records(b"a\0b\0", Separator::Nul).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn splits_lines_and_strips_carriage_returns() {
        assert_eq!(
            records(b"a\r\nb\n\nc", Separator::Newline).await,
            vec!["a", "b", "", "c"]
        );
    }

    #[tokio::test]
    async fn empty_input_has_no_records() {
        assert!(records(b"", Separator::Newline).await.is_empty());
        assert!(records(b"", Separator::Nul).await.is_empty());
    }

    #[tokio::test]
    async fn newline_is_data_in_nul_mode() {
        assert_eq!(
            records(b"two words\nline\0x", Separator::Nul).await,
            vec!["two words\nline", "x"]
        );
    }

    #[test]
    fn normalize_trims_and_skips_blank() {
        assert_eq!(normalize(b"  hi \t"), Some(&b"hi"[..]));
        assert_eq!(normalize(b"c\0"), Some(&b"c"[..]));
        assert_eq!(normalize(b"a b"), Some(&b"a b"[..]));
        assert_eq!(normalize("\u{a0}x\u{3000}".as_bytes()), Some(&b"x"[..]));
        assert_eq!(normalize(b""), None);
        assert_eq!(normalize(b" \t\r"), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_kept_byte_for_byte() {
        let mut reader = RecordReader::new(&b"caf\xe9.txt\n\xff\n"[..], Separator::Newline);

        assert_eq!(
            reader.next_record().await.unwrap(),
            Some(b"caf\xe9.txt".to_vec())
        );
        assert_eq!(reader.next_record().await.unwrap(), Some(vec![0xff]));
        assert_eq!(reader.next_record().await.unwrap(), None);
        assert_eq!(normalize(b" \t caf\xe9.txt\0 "), Some(&b"caf\xe9.txt"[..]));
    }
}
