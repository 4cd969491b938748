#![allow(dead_code)]

// Mock drive infrastructure for testing
//
// Image files stand in for raw devices so the real opener and pass
// executor can run end to end. Fault-injecting devices cover the
// failures real hardware produces mid-pass.

use secure_erase::io::{BlockIo, DeviceOpener, MemoryDevice};
use secure_erase::{CancelToken, DeviceIdentity, EraseError, EraseResult};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Byte the images are filled with before erasure
pub const USED_DATA: u8 = 0xAB;

pub const MIB: u64 = 1024 * 1024;

/// Mock drive instance backed by a temp file
pub struct MockDrive {
    pub temp_file: NamedTempFile,
    size_bytes: u64,
}

impl MockDrive {
    /// Image of `size_bytes` filled with [`USED_DATA`]
    pub fn new(size_bytes: u64) -> std::io::Result<Self> {
        let mut temp_file = NamedTempFile::new()?;

        let mut written = 0u64;
        let chunk_size = MIB;
        while written < size_bytes {
            let write_size = (size_bytes - written).min(chunk_size);
            temp_file.write_all(&vec![USED_DATA; write_size as usize])?;
            written += write_size;
        }

        temp_file.flush()?;
        temp_file.seek(SeekFrom::Start(0))?;

        Ok(Self { temp_file, size_bytes })
    }

    pub fn create_mb(size_mb: u64) -> std::io::Result<Self> {
        Self::new(size_mb * MIB)
    }

    pub fn empty() -> std::io::Result<Self> {
        Self::new(0)
    }

    pub fn path(&self) -> &Path {
        self.temp_file.path()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.path().to_path_buf()).with_size_hint(self.size_bytes)
    }
}

/// In-memory device whose writes fail once the cursor reaches `fail_at`
pub struct FaultyDevice {
    inner: MemoryDevice,
    position: u64,
    fail_at: u64,
    released: Arc<AtomicBool>,
}

impl BlockIo for FaultyDevice {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn rewind(&mut self) -> EraseResult<()> {
        self.position = 0;
        self.inner.rewind()
    }

    fn write_chunk(&mut self, data: &[u8]) -> EraseResult<()> {
        if self.position >= self.fail_at {
            return Err(EraseError::Io(std::io::Error::other("medium error: unrecovered write")));
        }
        self.inner.write_chunk(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> EraseResult<()> {
        self.inner.read_chunk(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> EraseResult<()> {
        self.inner.sync()
    }
}

impl Drop for FaultyDevice {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Opens [`FaultyDevice`]s and records when they are released
pub struct FaultyOpener {
    pub size: usize,
    pub fail_at: u64,
    pub released: Arc<AtomicBool>,
}

impl FaultyOpener {
    pub fn new(size: usize, fail_at: u64) -> Self {
        Self {
            size,
            fail_at,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DeviceOpener for FaultyOpener {
    fn open(&self, device: &DeviceIdentity) -> EraseResult<Box<dyn BlockIo>> {
        Ok(Box::new(FaultyDevice {
            inner: MemoryDevice::new(device.path.clone(), self.size, USED_DATA),
            position: 0,
            fail_at: self.fail_at,
            released: Arc::clone(&self.released),
        }))
    }
}

/// In-memory device that pulls the cancel token after `cancel_after` bytes
pub struct InterruptingDevice {
    inner: MemoryDevice,
    written: u64,
    cancel_after: u64,
    cancel: CancelToken,
}

impl BlockIo for InterruptingDevice {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn rewind(&mut self) -> EraseResult<()> {
        self.inner.rewind()
    }

    fn write_chunk(&mut self, data: &[u8]) -> EraseResult<()> {
        self.inner.write_chunk(data)?;
        self.written += data.len() as u64;
        if self.written >= self.cancel_after {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> EraseResult<()> {
        self.inner.read_chunk(buf)
    }

    fn sync(&mut self) -> EraseResult<()> {
        self.inner.sync()
    }
}

pub struct InterruptingOpener {
    pub size: usize,
    pub cancel_after: u64,
    pub cancel: CancelToken,
}

impl DeviceOpener for InterruptingOpener {
    fn open(&self, device: &DeviceIdentity) -> EraseResult<Box<dyn BlockIo>> {
        Ok(Box::new(InterruptingDevice {
            inner: MemoryDevice::new(device.path.clone(), self.size, USED_DATA),
            written: 0,
            cancel_after: self.cancel_after,
            cancel: self.cancel.clone(),
        }))
    }
}

/// Path that does not exist on any test host
pub fn missing_device_path() -> PathBuf {
    std::env::temp_dir().join("secure-erase-missing").join("sdz")
}
