//! View-level tests against the in-memory backend.

pub(crate) mod helpers;
mod take_and_lock;
