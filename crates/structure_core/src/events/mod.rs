//! System events emitted by structure writes.

pub mod system_event;
