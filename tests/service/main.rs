//! Demo service integration tests.
#![cfg(feature = "http")]

mod support;
mod state;
mod http;
