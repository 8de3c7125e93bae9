// SPDX-License-Identifier: MPL-2.0

mod client;
mod types;

pub use client::{BooruProvider, Rule34Client};
pub use types::{PageQuery, RawPost, RawSuggestion, RemotePost, TagSuggestion};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {status} for {context}")]
    Status { status: u16, context: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
