use super::platform_specific::{get_platform_io, PlatformIO};
use crate::error::{classify_io_error, EraseError, EraseResult};
use crate::DeviceIdentity;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Sequential access to a raw device for the duration of one session.
///
/// Passes always start with [`BlockIo::rewind`] and then stream chunks
/// front to back; there is no random access.
pub trait BlockIo: Send {
    fn path(&self) -> &Path;

    /// Total addressable bytes, fixed when the handle was opened
    fn size(&self) -> u64;

    /// Reset the cursor to byte 0
    fn rewind(&mut self) -> EraseResult<()>;

    /// Write all of `data` at the cursor
    fn write_chunk(&mut self, data: &[u8]) -> EraseResult<()>;

    /// Fill all of `buf` from the cursor
    fn read_chunk(&mut self, buf: &mut [u8]) -> EraseResult<()>;

    /// Push written data to stable storage
    fn sync(&mut self) -> EraseResult<()>;
}

/// Acquires a [`BlockIo`] for a device identity.
///
/// Failures must already be classified (`AccessDenied`, `NotFound`) so the
/// orchestrator can make its fallback decision.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, device: &DeviceIdentity) -> EraseResult<Box<dyn BlockIo>>;
}

/// Open handle on a raw block device (or an image file standing in for one)
pub struct BlockDevice {
    path: PathBuf,
    file: File,
    size: u64,
    platform: Box<dyn PlatformIO>,
}

impl BlockDevice {
    pub fn open(path: &Path, exclusive: bool) -> EraseResult<Self> {
        let platform = get_platform_io();
        let mut file = platform
            .open_device(path, exclusive)
            .map_err(|e| classify_io_error(path, e))?;

        // Block devices report st_size 0, so ask the device itself
        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        tracing::debug!(
            device = %path.display(),
            size,
            exclusive,
            platform = platform.platform_name(),
            "Opened block device"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
            platform,
        })
    }
}

impl BlockIo for BlockDevice {
    fn path(&self) -> &Path {
        &self.path
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn rewind(&mut self) -> EraseResult<()> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> EraseResult<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> EraseResult<()> {
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> EraseResult<()> {
        self.file.flush()?;
        self.platform.sync_device(&self.file)?;
        Ok(())
    }
}

impl Drop for BlockDevice {
    fn drop(&mut self) {
        tracing::debug!(device = %self.path.display(), "Released block device");
    }
}

/// Opens real devices through the platform layer
#[derive(Debug, Clone, Copy)]
pub struct RawDeviceOpener {
    pub exclusive: bool,
}

impl Default for RawDeviceOpener {
    fn default() -> Self {
        Self { exclusive: true }
    }
}

impl DeviceOpener for RawDeviceOpener {
    fn open(&self, device: &DeviceIdentity) -> EraseResult<Box<dyn BlockIo>> {
        let handle = BlockDevice::open(&device.path, self.exclusive)?;
        Ok(Box::new(handle))
    }
}

/// In-memory device for dry runs, benchmarks and tests
pub struct MemoryDevice {
    path: PathBuf,
    data: Vec<u8>,
    cursor: usize,
    syncs: usize,
}

impl MemoryDevice {
    pub fn new(path: impl Into<PathBuf>, size: usize, fill: u8) -> Self {
        Self {
            path: path.into(),
            data: vec![fill; size],
            cursor: 0,
            syncs: 0,
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn sync_count(&self) -> usize {
        self.syncs
    }

    fn span(&self, len: usize) -> EraseResult<std::ops::Range<usize>> {
        let end = self.cursor + len;
        if end > self.data.len() {
            return Err(EraseError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("access past end of device at byte {}", self.cursor),
            )));
        }
        Ok(self.cursor..end)
    }
}

impl BlockIo for MemoryDevice {
    fn path(&self) -> &Path {
        &self.path
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn rewind(&mut self) -> EraseResult<()> {
        self.cursor = 0;
        Ok(())
    }

    fn write_chunk(&mut self, data: &[u8]) -> EraseResult<()> {
        let range = self.span(data.len())?;
        self.cursor = range.end;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> EraseResult<()> {
        let range = self.span(buf.len())?;
        self.cursor = range.end;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn sync(&mut self) -> EraseResult<()> {
        self.syncs += 1;
        Ok(())
    }
}
