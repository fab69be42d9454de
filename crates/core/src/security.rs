pub mod encryption;

pub use encryption::{AccessCode, EncryptionService, ReceiptCode};
