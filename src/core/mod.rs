pub mod discovery;
pub mod duplicate;
pub mod fingerprint;
pub mod hash;
pub mod progress;
pub mod scanner;
