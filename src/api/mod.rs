mod client;
mod types;

pub use client::{ApiResponse, RemoteClient};
pub use types::{GraphPayload, RemoteNode, SearchParams, SearchResponse};
