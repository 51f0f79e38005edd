//! Test helpers, compiled for unit tests and under the `test-support`
//! feature.
//!
//! - [`StubServer`]: a loopback HTTP/1.1 server answering canned replies
//!
//! Not part of the stable API.

mod server;

pub use server::{Reply, StubServer};
