//! Request handlers, one module per resource family from the HTTP surface
//! table (spec.md §6). Each `*_routes()` function returns a
//! `Router<AppState>` nested under `/api/v1` by `main.rs`.

pub mod anonymous;
pub mod cases;
pub mod health;
pub mod metrics;
pub mod ombudsperson;
pub mod submissions;
