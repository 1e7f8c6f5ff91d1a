// [libs/infra/artifact-client/src/lib.rs]
//! HTTP adapter implementing `mtracker_domain_result_tree::ArtifactSink`
//! against a mwdb-style artifact store REST API.

pub mod client;
pub mod errors;

pub use client::MwdbArtifactClient;
pub use errors::ArtifactClientError;
