//! Deterministic, pure logic shared by the board.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod model;
pub mod primitives;
pub mod resolver;
pub mod validator;
