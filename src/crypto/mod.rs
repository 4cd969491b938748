pub mod fingerprint;
pub mod secure_rng;


// Re-export
pub use fingerprint::sha256_fingerprint;
pub use secure_rng::secure_random_bytes;
