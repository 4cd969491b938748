pub mod block_device;
pub mod platform_specific;


// Re-exports
pub use block_device::{BlockDevice, BlockIo, DeviceOpener, MemoryDevice, RawDeviceOpener};
pub use platform_specific::{get_platform_io, PlatformIO};
