#![cfg(unix)]

pub(crate) mod fixture;

mod async_surface;
mod realpath;
