// Shared test fixtures. Compiled only for tests via `test_support` in `src/lib.rs`.

pub mod events;
pub mod heartbeats;
