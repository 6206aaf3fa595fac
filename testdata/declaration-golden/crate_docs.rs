// Copyright 2031 Acme
//! Widget internals.
//!
//! Start at `run`.
pub fn run() {}
