pub mod service;

pub use service::{MaskedCaseEvent, OmbudspersonCaseView, OmbudspersonService, REDACTED};
