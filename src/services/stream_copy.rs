use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::models::MultipartFraming;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A staged request body on disk.
///
/// The file is removed when the handle is dropped unless [`keep`] is called.
///
/// [`keep`]: StagedUploadFile::keep
#[derive(Debug)]
pub struct StagedUploadFile {
    path: TempPath,
    len: u64,
}

impl StagedUploadFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total size of the staged body (prefix, file bytes and suffix)
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Persist the file and hand its lifecycle over to the caller.
    pub fn keep(self) -> io::Result<PathBuf> {
        self.path.keep().map_err(|e| e.error)
    }

    /// Delete the file now, reporting any error.
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Copies a source file into a new staged file with framing bytes around it,
/// keeping at most one chunk of the source in memory.
#[derive(Debug, Clone)]
pub struct StreamCopier {
    chunk_size: usize,
    temp_dir: PathBuf,
}

impl StreamCopier {
    pub fn new(chunk_size: usize, temp_dir: PathBuf) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            temp_dir,
        }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(config.chunk_size, config.temp_dir.clone())
    }

    /// Write the prefix, then the source file, then `append` into a new file
    /// under the temp dir.
    ///
    /// Both files are closed before the staged handle is returned. On error
    /// the partially written destination is removed.
    pub fn copy_with_framing(
        &self,
        source: &Path,
        prefix: &[u8],
        append: &[u8],
    ) -> io::Result<StagedUploadFile> {
        let mut src = File::open(source)?;
        let (mut dst, path) = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".tmp")
            .tempfile_in(&self.temp_dir)?
            .into_parts();

        let len = copy_framed(&mut src, &mut dst, prefix, append, self.chunk_size)?;
        dst.flush()?;
        dst.sync_all()?;
        drop(dst);
        drop(src);

        tracing::debug!(
            "Staged {} bytes from {} at {}",
            len,
            source.display(),
            path.display()
        );

        Ok(StagedUploadFile { path, len })
    }

    /// Run [`copy_with_framing`](Self::copy_with_framing) on the blocking
    /// thread pool.
    pub async fn stage(
        &self,
        source: &Path,
        framing: MultipartFraming,
    ) -> Result<StagedUploadFile, UploadError> {
        let copier = self.clone();
        let source = source.to_path_buf();

        let staged = tokio::task::spawn_blocking(move || {
            copier.copy_with_framing(&source, &framing.prefix, &framing.suffix)
        })
        .await
        .map_err(io::Error::other)??;

        Ok(staged)
    }
}

/// Copy `src` into `dst` between `prefix` and `append` using a single
/// buffer of `chunk_size` bytes. Returns the number of bytes written.
///
/// Short writes are retried against the unwritten tail; a write that accepts
/// zero bytes fails with [`io::ErrorKind::WriteZero`].
pub fn copy_framed<R, W>(
    src: &mut R,
    dst: &mut W,
    prefix: &[u8],
    append: &[u8],
    chunk_size: usize,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    dst.write_all(prefix)?;
    total += prefix.len() as u64;

    loop {
        let n = match src.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buffer[..n])?;
        total += n as u64;
    }

    dst.write_all(append)?;
    total += append.len() as u64;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn framed(prefix: &[u8], body: &[u8], suffix: &[u8]) -> Vec<u8> {
        [prefix, body, suffix].concat()
    }

    /// Writer accepting at most a few bytes per call
    struct TrickleWriter {
        inner: Vec<u8>,
        max: usize,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.max);
            self.inner.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Synthetic source that records the largest read request it sees
    struct CountingSource {
        remaining: u64,
        largest_request: usize,
    }

    impl Read for CountingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.largest_request = self.largest_request.max(buf.len());
            let n = (buf.len() as u64).min(self.remaining) as usize;
            buf[..n].fill(0xAB);
            self.remaining -= n as u64;
            Ok(n)
        }
    }

    struct FailingSource {
        served: bool,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("disk gone"));
            }
            self.served = true;
            buf[0] = 1;
            Ok(1)
        }
    }

    #[test]
    fn test_copy_framed_is_byte_exact() {
        let chunk = 16;
        for size in [0usize, 1, chunk - 1, chunk, chunk + 1, chunk * 5 + 3] {
            let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut out = Vec::new();
            let n = copy_framed(&mut Cursor::new(&body), &mut out, b"PRE", b"POST", chunk).unwrap();

            assert_eq!(n as usize, 3 + size + 4);
            assert_eq!(out, framed(b"PRE", &body, b"POST"));
        }
    }

    #[test]
    fn test_partial_writes_are_retried() {
        let body = vec![7u8; 100];
        let mut out = TrickleWriter {
            inner: Vec::new(),
            max: 3,
        };
        copy_framed(&mut Cursor::new(&body), &mut out, b"--b\r\n", b"\r\n--b--\r\n", 32).unwrap();
        assert_eq!(out.inner, framed(b"--b\r\n", &body, b"\r\n--b--\r\n"));
    }

    #[test]
    fn test_zero_byte_write_aborts() {
        let err = copy_framed(&mut Cursor::new(b"data"), &mut BrokenWriter, b"p", b"s", 8)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_read_error_is_propagated() {
        let mut out = Vec::new();
        let err = copy_framed(&mut FailingSource { served: false }, &mut out, b"p", b"s", 8)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_memory_is_bounded_by_chunk_size() {
        let chunk = 4 * 1024;
        let size = 32 * 1024 * 1024;
        let mut src = CountingSource {
            remaining: size,
            largest_request: 0,
        };
        let n = copy_framed(&mut src, &mut io::sink(), b"pre", b"post", chunk).unwrap();

        assert_eq!(n, size + 7);
        assert!(src.largest_request <= chunk);
    }

    #[test]
    fn test_copy_with_framing_creates_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.jpg");
        let body: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
        std::fs::write(&source, &body).unwrap();

        let copier = StreamCopier::new(64 * 1024, dir.path().to_path_buf());
        let staged = copier.copy_with_framing(&source, b"HEAD", b"TAIL").unwrap();

        assert_eq!(staged.len(), 4 + body.len() as u64 + 4);
        assert_eq!(std::fs::metadata(staged.path()).unwrap().len(), staged.len());
        assert_eq!(std::fs::read(staged.path()).unwrap(), framed(b"HEAD", &body, b"TAIL"));
        assert!(staged.path().extension().is_some_and(|e| e == "tmp"));
    }

    #[test]
    fn test_empty_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty.png");
        std::fs::write(&source, b"").unwrap();

        let copier = StreamCopier::new(1024, dir.path().to_path_buf());
        let staged = copier.copy_with_framing(&source, b"HEAD", b"TAIL").unwrap();
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"HEADTAIL");
    }

    #[test]
    fn test_staged_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mov");
        std::fs::write(&source, b"frames").unwrap();

        let copier = StreamCopier::new(1024, dir.path().to_path_buf());
        let staged = copier.copy_with_framing(&source, b"a", b"b").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_staged_file_keep() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mov");
        std::fs::write(&source, b"frames").unwrap();

        let copier = StreamCopier::new(1024, dir.path().to_path_buf());
        let path = copier
            .copy_with_framing(&source, b"a", b"b")
            .unwrap()
            .keep()
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"aframesb");
    }

    #[test]
    fn test_missing_source_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir(&staging).unwrap();

        let copier = StreamCopier::new(1024, staging.clone());
        let err = copier
            .copy_with_framing(&dir.path().join("missing.jpg"), b"a", b"b")
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stage_runs_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("image.png");
        std::fs::write(&source, b"pixels").unwrap();

        let copier = StreamCopier::new(2, dir.path().to_path_buf());
        let framing = MultipartFraming {
            prefix: bytes::Bytes::from_static(b"<"),
            suffix: bytes::Bytes::from_static(b">"),
        };
        let staged = copier.stage(&source, framing).await.unwrap();
        assert_eq!(tokio::fs::read(staged.path()).await.unwrap(), b"<pixels>");
    }

    #[tokio::test]
    async fn test_stage_reports_stream_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let copier = StreamCopier::new(1024, dir.path().to_path_buf());
        let framing = MultipartFraming {
            prefix: bytes::Bytes::from_static(b"<"),
            suffix: bytes::Bytes::from_static(b">"),
        };
        let err = copier
            .stage(&dir.path().join("nope.mov"), framing)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::StreamIo(_)));
    }

    #[test]
    #[ignore = "writes a 500 MB synthetic file"]
    fn test_large_file_copy_with_bounded_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("large.mov");
        let size: u64 = 500 * 1024 * 1024;
        {
            let mut src = CountingSource {
                remaining: size,
                largest_request: 0,
            };
            let mut f = File::create(&source).unwrap();
            io::copy(&mut src, &mut f).unwrap();
        }

        let copier = StreamCopier::new(64 * 1024, dir.path().to_path_buf());
        let staged = copier.copy_with_framing(&source, b"prefix", b"suffix").unwrap();
        assert_eq!(staged.len(), size + 12);
        assert_eq!(std::fs::metadata(staged.path()).unwrap().len(), size + 12);
    }
}
