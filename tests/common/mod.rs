/// Common test utilities and mock infrastructure
///
/// This module provides shared functionality for integration tests including:
/// - Image-file drives standing in for raw devices
/// - Fault-injecting devices and openers
/// - Content checks on erased images

pub mod mock_drive;
pub mod test_helpers;
