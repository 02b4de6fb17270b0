//! Streaming reader that computes a SHA-256 hash on-the-fly.

use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, ReadBuf};

use super::object_data::ObjectDigest;

pin_project! {
    /// An async reader wrapper that hashes data as it flows through.
    ///
    /// This allows verifying a download against its recorded digest without
    /// buffering the entire content in memory.
    pub struct HashingReader<R> {
        #[pin]
        inner: R,
        hasher: Sha256,
    }
}

impl<R> HashingReader<R> {
    /// Creates a new hashing reader wrapping the given reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Consumes the reader and returns the SHA-256 digest.
    pub fn finalize(self) -> ObjectDigest {
        let digest: [u8; 32] = self.hasher.finalize().into();
        ObjectDigest::from(digest)
    }
}

impl<R: AsyncRead> AsyncRead for HashingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();

        match this.inner.poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                this.hasher.update(&buf.filled()[before..]);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_hashing_reader_empty() {
        let data: &[u8] = &[];
        let reader = HashingReader::new(data);

        // Empty SHA-256 hash
        let expected = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(reader.finalize().to_hex(), expected);
    }

    #[tokio::test]
    async fn test_hashing_reader_chunked() {
        let data = b"Hello, World!";
        let mut reader = HashingReader::new(&data[..]);

        // Read in small chunks
        let mut buf = [0u8; 5];
        let mut total = Vec::new();

        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            total.extend_from_slice(&buf[..n]);
        }

        assert_eq!(total, data);

        let expected = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";
        assert_eq!(reader.finalize().to_hex(), expected);
    }
}
