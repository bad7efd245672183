//! Record sources feeding the vocabulary builder.

use std::fs::File;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::LoadError;

/// Memory-mapped word-vector file yielding one raw record per line.
pub struct VectorFile {
    path: PathBuf,
    mmap: Option<Mmap>,
}

impl VectorFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| LoadError::Open {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(open_error)?;
        let len = file.metadata().map_err(open_error)?.len();
        // Zero-length files cannot be mapped.
        let mmap = if len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file) }.map_err(open_error)?)
        };
        Ok(Self { path, mmap })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapped file in bytes.
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    /// Iterates over the records of the file, stripping `\n` and `\r\n` terminators.
    pub fn records(&self) -> impl Iterator<Item = Result<&[u8], LoadError>> + '_ {
        let bytes = self.bytes();
        let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        body.split(|byte| *byte == b'\n')
            .filter(move |_| !bytes.is_empty())
            .map(|record| Ok::<_, LoadError>(record.strip_suffix(b"\r").unwrap_or(record)))
    }
}

/// Streams records from any buffered reader, for sources that cannot be mapped.
pub fn reader_records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Vec<u8>, LoadError>> {
    reader.split(b'\n').map(|record| -> Result<Vec<u8>, LoadError> {
        let mut record = record?;
        if record.last() == Some(&b'\r') {
            record.pop();
        }
        Ok(record)
    })
}
