//! Configuration and registry errors.
//!
//! Map operations never return these: their outcomes are plain `bool`s and
//! `Option`s.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown engine kind: {0:?}")]
    UnknownEngine(String),

    #[error("unknown engine code: {0}")]
    UnknownEngineCode(u32),

    #[error("unknown hash algorithm: {0:?}")]
    UnknownHashAlgorithm(String),

    #[error("unknown key layout: {0:?}")]
    UnknownKeyLayout(String),

    #[error("shard count must be a non-zero power of two, got {0}")]
    InvalidShardCount(usize),

    #[error("invalid value for {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("engine handle is not live")]
    UnknownHandle,
}

pub type Result<T> = std::result::Result<T, Error>;
