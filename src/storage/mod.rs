//! Storage
//!
//! The shared, mutex-guarded key-value map with millisecond expiry, plus an
//! optional background sweeper.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │            Store             │
//! │  Mutex<HashMap<Bytes, Entry>>│◄──── get / set from every session
//! └──────────────────────────────┘
//!                ▲
//!                │ cleanup_expired()  (only with --sweep-interval-ms)
//!       ┌────────┴────────┐
//!       │  ExpirySweeper  │
//!       └─────────────────┘
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{now_millis, Entry, Store, StoreStats};
pub use expiry::ExpirySweeper;
