use crate::error::{EraseError, EraseResult};
use ring::rand::{SecureRandom, SystemRandom};

lazy_static::lazy_static! {
    static ref SYSTEM_RNG: SystemRandom = SystemRandom::new();
}

/// Largest slice handed to the OS generator in one call
const MAX_FILL: usize = 64 * 1024;

/// Fill `dest` with bytes from the operating system CSPRNG.
///
/// Every call draws fresh entropy; nothing is cached between calls.
pub fn secure_random_bytes(dest: &mut [u8]) -> EraseResult<()> {
    for chunk in dest.chunks_mut(MAX_FILL) {
        SYSTEM_RNG
            .fill(chunk)
            .map_err(|_| EraseError::Rng("system random source unavailable".to_string()))?;
    }
    Ok(())
}

/// Shannon entropy in bits per byte
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}
