//! Ports to external collaborators: blob storage and the completion API.

pub mod blob_store;
pub mod completion;

pub use blob_store::{BlobStore, BlobStream};
pub use completion::{CompletionClient, CompletionRequest, CompletionResponse};

#[cfg(test)]
pub use completion::MockCompletionClient;
