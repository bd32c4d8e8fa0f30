//! 后台 Worker

pub mod mint_worker;

pub use mint_worker::MintWorker;
