//! Domain-level error handling.
//!
//! Every failure mode a domain operation can produce - bad state transition,
//! conflict on a repeat statutory operation, not-found, opaque crypto
//! failure - is already representable by `hinschg_core::Error`, so this
//! crate does not introduce a parallel error enum. It reuses the core type
//! and its constructors (`Error::bad_transition`, `Error::conflict`, ...)
//! directly; `From<sqlx::Error>` on the core type lets repository code
//! propagate database errors with a plain `?`.

pub use hinschg_core::error::{Error, ErrorCode, Result};
