// Pass executor: one overwrite or verify sweep across the whole device
//
// Both passes are pull iterators over progress checkpoints. Each call to
// `next()` moves exactly one chunk, so the caller decides how often to
// publish progress and can stop consuming at any point.
//
//   Positioning ──▶ Writing ──▶ Draining ──▶ Done
//        │      (full chunks)  (final partial)  ▲
//        └──────────── total == 0 ──────────────┘

use super::pattern::{Pattern, PatternGenerator};
use crate::error::{EraseError, EraseResult};
use crate::io::BlockIo;
use crate::CancelToken;

/// Default chunk size for every pass
pub const BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Positioning,
    Writing,
    Draining,
    Done,
}

/// Checkpoint yielded after every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassProgress {
    pub processed: u64,
    pub total: u64,
    /// Bytes written by the call that produced this checkpoint
    pub chunk: u64,
}

impl PassProgress {
    pub fn percent(&self) -> f64 {
        percent_of(self.processed, self.total)
    }
}

/// Checkpoint yielded after every verified chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyProgress {
    /// Bytes confirmed so far; on mismatch, the offset of the first bad byte
    pub verified: u64,
    pub total: u64,
    pub matched: bool,
}

impl VerifyProgress {
    pub fn mismatch_offset(&self) -> Option<u64> {
        if self.matched {
            None
        } else {
            Some(self.verified)
        }
    }

    pub fn percent(&self) -> f64 {
        percent_of(self.verified, self.total)
    }
}

fn percent_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

fn next_phase(processed: u64, total: u64, chunk_size: usize) -> PassState {
    let remaining = total - processed;
    if remaining == 0 {
        PassState::Done
    } else if remaining < chunk_size as u64 {
        PassState::Draining
    } else {
        PassState::Writing
    }
}

/// One overwrite pass. Finite and not restartable.
pub struct WritePass<'a> {
    device: &'a mut dyn BlockIo,
    generator: PatternGenerator,
    chunk_size: usize,
    cancel: CancelToken,
    processed: u64,
    total: u64,
    state: PassState,
}

impl<'a> WritePass<'a> {
    fn new(
        device: &'a mut dyn BlockIo,
        pattern: Pattern,
        chunk_size: usize,
        cancel: CancelToken,
    ) -> Self {
        let total = device.size();
        Self {
            device,
            generator: PatternGenerator::new(pattern, chunk_size),
            chunk_size,
            cancel,
            processed: 0,
            total,
            state: PassState::Positioning,
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.generator.pattern()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn write_next_chunk(&mut self) -> EraseResult<PassProgress> {
        if self.cancel.is_cancelled() {
            return Err(EraseError::Cancelled);
        }

        let remaining = self.total - self.processed;
        let len = remaining.min(self.chunk_size as u64) as usize;

        let data = self.generator.buffer(len)?;
        self.device.write_chunk(data)?;
        self.processed += len as u64;

        self.state = next_phase(self.processed, self.total, self.chunk_size);
        if self.state == PassState::Done {
            self.device.sync()?;
        }

        Ok(PassProgress {
            processed: self.processed,
            total: self.total,
            chunk: len as u64,
        })
    }
}

impl Iterator for WritePass<'_> {
    type Item = EraseResult<PassProgress>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                PassState::Positioning => {
                    if self.total == 0 {
                        self.state = PassState::Done;
                        return None;
                    }
                    if let Err(e) = self.device.rewind() {
                        self.state = PassState::Done;
                        return Some(Err(e));
                    }
                    self.state = next_phase(0, self.total, self.chunk_size);
                }
                PassState::Writing | PassState::Draining => {
                    let result = self.write_next_chunk();
                    if result.is_err() {
                        self.state = PassState::Done;
                    }
                    return Some(result);
                }
                PassState::Done => return None,
            }
        }
    }
}

/// Read-back of a fixed pattern. Stops at the first mismatching byte.
pub struct VerifyPass<'a> {
    device: &'a mut dyn BlockIo,
    expected: u8,
    buffer: Vec<u8>,
    chunk_size: usize,
    cancel: CancelToken,
    verified: u64,
    total: u64,
    state: PassState,
}

impl<'a> VerifyPass<'a> {
    fn new(
        device: &'a mut dyn BlockIo,
        pattern: Pattern,
        chunk_size: usize,
        cancel: CancelToken,
    ) -> EraseResult<Self> {
        let expected = pattern
            .fill_byte()
            .ok_or_else(|| EraseError::UnverifiablePattern(pattern.to_string()))?;
        let total = device.size();

        Ok(Self {
            device,
            expected,
            buffer: vec![0u8; chunk_size],
            chunk_size,
            cancel,
            verified: 0,
            total,
            state: PassState::Positioning,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn verify_next_chunk(&mut self) -> EraseResult<VerifyProgress> {
        if self.cancel.is_cancelled() {
            return Err(EraseError::Cancelled);
        }

        let remaining = self.total - self.verified;
        let len = remaining.min(self.chunk_size as u64) as usize;

        let chunk = &mut self.buffer[..len];
        self.device.read_chunk(chunk)?;

        let expected = self.expected;
        if let Some(pos) = chunk.iter().position(|&b| b != expected) {
            self.state = PassState::Done;
            return Ok(VerifyProgress {
                verified: self.verified + pos as u64,
                total: self.total,
                matched: false,
            });
        }

        self.verified += len as u64;
        self.state = next_phase(self.verified, self.total, self.chunk_size);

        Ok(VerifyProgress {
            verified: self.verified,
            total: self.total,
            matched: true,
        })
    }
}

impl Iterator for VerifyPass<'_> {
    type Item = EraseResult<VerifyProgress>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                PassState::Positioning => {
                    if self.total == 0 {
                        self.state = PassState::Done;
                        return None;
                    }
                    if let Err(e) = self.device.rewind() {
                        self.state = PassState::Done;
                        return Some(Err(e));
                    }
                    self.state = next_phase(0, self.total, self.chunk_size);
                }
                PassState::Writing | PassState::Draining => {
                    let result = self.verify_next_chunk();
                    if result.is_err() {
                        self.state = PassState::Done;
                    }
                    return Some(result);
                }
                PassState::Done => return None,
            }
        }
    }
}

/// Builds passes bound to one session's chunk size and cancel token
#[derive(Debug, Clone)]
pub struct PassExecutor {
    chunk_size: usize,
    cancel: CancelToken,
}

impl PassExecutor {
    pub fn new(chunk_size: usize, cancel: CancelToken) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            cancel,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn write_pass<'a>(&self, device: &'a mut dyn BlockIo, pattern: Pattern) -> WritePass<'a> {
        WritePass::new(device, pattern, self.chunk_size, self.cancel.clone())
    }

    /// Fails with `UnverifiablePattern` for random data
    pub fn verify_pass<'a>(
        &self,
        device: &'a mut dyn BlockIo,
        pattern: Pattern,
    ) -> EraseResult<VerifyPass<'a>> {
        VerifyPass::new(device, pattern, self.chunk_size, self.cancel.clone())
    }
}

impl Default for PassExecutor {
    fn default() -> Self {
        Self::new(BUFFER_SIZE, CancelToken::new())
    }
}
