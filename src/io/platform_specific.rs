use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Platform-specific raw device open
pub trait PlatformIO: Send + Sync {
    /// Open `path` for read/write. With `exclusive`, the platform refuses
    /// the open when another party holds the device.
    fn open_device(&self, path: &Path, exclusive: bool) -> io::Result<File>;

    /// Flush written data all the way to the medium
    fn sync_device(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    /// Get platform name for logging
    fn platform_name(&self) -> &str;
}

fn read_write() -> OpenOptions {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true);
    opts
}

// ============= LINUX IMPLEMENTATION =============

#[cfg(target_os = "linux")]
pub struct LinuxIO;

#[cfg(target_os = "linux")]
impl PlatformIO for LinuxIO {
    fn open_device(&self, path: &Path, exclusive: bool) -> io::Result<File> {
        use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};

        let mut opts = read_write();

        // O_EXCL on a block device fails with EBUSY while it is mounted or
        // claimed. On regular files it would mean "create", so skip it there.
        let is_block = std::fs::metadata(path)?.file_type().is_block_device();
        if exclusive && is_block {
            opts.custom_flags(libc::O_EXCL);
        }

        opts.open(path)
    }

    fn platform_name(&self) -> &str {
        "Linux"
    }
}

// ============= WINDOWS IMPLEMENTATION =============

#[cfg(target_os = "windows")]
pub struct WindowsIO;

#[cfg(target_os = "windows")]
impl PlatformIO for WindowsIO {
    fn open_device(&self, path: &Path, exclusive: bool) -> io::Result<File> {
        use std::os::windows::fs::OpenOptionsExt;

        let mut opts = read_write();
        if exclusive {
            // dwShareMode = 0: no other handle may read or write
            opts.share_mode(0);
        }
        opts.open(path)
    }

    fn platform_name(&self) -> &str {
        "Windows"
    }
}

// ============= MACOS IMPLEMENTATION =============

#[cfg(target_os = "macos")]
pub struct MacOSIO;

#[cfg(target_os = "macos")]
impl PlatformIO for MacOSIO {
    fn open_device(&self, path: &Path, _exclusive: bool) -> io::Result<File> {
        read_write().open(path)
    }

    fn sync_device(&self, file: &File) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        // F_FULLFSYNC is the only call that reaches the platter on macOS
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn platform_name(&self) -> &str {
        "macOS"
    }
}

// ============= GENERIC IMPLEMENTATION =============

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
pub struct GenericIO;

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
impl PlatformIO for GenericIO {
    fn open_device(&self, path: &Path, _exclusive: bool) -> io::Result<File> {
        read_write().open(path)
    }

    fn platform_name(&self) -> &str {
        "generic"
    }
}

// ============= PLATFORM FACTORY =============

/// Get the appropriate platform I/O implementation
pub fn get_platform_io() -> Box<dyn PlatformIO> {
    #[cfg(target_os = "linux")]
    {
        Box::new(LinuxIO)
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsIO)
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(MacOSIO)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        Box::new(GenericIO)
    }
}
