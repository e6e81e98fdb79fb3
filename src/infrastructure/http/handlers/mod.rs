//! HTTP Handlers

mod done;
mod fragment;
mod ping;

pub use done::*;
pub use fragment::*;
pub use ping::*;
