// [libs/domain/result-tree/src/upload.rs]
//! Depth-first upload of a result tree to an external, content-addressed
//! artifact store. The store itself is not this crate's concern — only
//! the traversal order and the tag/comment attachment sequence are, so
//! they're expressed against the `ArtifactSink` trait and implemented
//! for real once in `mtracker-infra-artifact-client`.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ReportError;
use crate::node::{NodeMeta, ResultNode};

const MAX_REPORT_DEPTH: u32 = 10;

/// One uploaded artifact, as recorded for persistence once the tree
/// upload finishes.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub kind: &'static str,
    pub name: String,
    pub tags: Vec<String>,
    pub sha256: String,
}

/// The artifact store's upload surface. Implementations return the
/// sha256 of the freshly created object so children can parent off it.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn upload_config(
        &self,
        family: &str,
        config: &Value,
        config_type: &str,
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String>;

    async fn upload_file(
        &self,
        name: &str,
        content: &[u8],
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String>;

    async fn upload_blob(
        &self,
        name: &str,
        blob_type: &str,
        content: &str,
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String>;

    async fn attach_tag(&self, sha256: &str, tag: &str) -> anyhow::Result<()>;

    async fn attach_comment(&self, sha256: &str, comment: &str) -> anyhow::Result<()>;
}

async fn attach_meta(sink: &dyn ArtifactSink, sha256: &str, meta: &NodeMeta) -> anyhow::Result<()> {
    for tag in &meta.tags {
        sink.attach_tag(sha256, tag).await?;
    }
    for comment in &meta.comments {
        sink.attach_comment(sha256, comment).await?;
    }
    Ok(())
}

/// Uploads `node` and every descendant depth-first, parenting each child
/// off the sha256 its parent was assigned. Returns the flat list of
/// every artifact created, in upload order.
pub async fn report_tree(
    sink: &dyn ArtifactSink,
    node: &ResultNode,
    parent: Option<&str>,
    depth: u32,
) -> Result<Vec<UploadedArtifact>, ReportError> {
    if depth > MAX_REPORT_DEPTH {
        return Err(ReportError::MaxDepthExceeded);
    }

    let mut results = Vec::new();
    let this_hash: Option<String>;

    match node {
        ResultNode::Generic { .. } => {
            // A generic node carries no artifact of its own — its children
            // parent directly off whatever parent this node itself received.
            this_hash = parent.map(str::to_string);
        }
        ResultNode::Config { config, config_type, meta, .. } => {
            let family = config
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let sha256 = sink
                .upload_config(family, config, config_type, &meta.attributes, parent)
                .await?;
            attach_meta(sink, &sha256, meta).await?;
            results.push(UploadedArtifact {
                kind: "config",
                name: config_type.clone(),
                tags: meta.tags.clone(),
                sha256: sha256.clone(),
            });
            this_hash = Some(sha256);
        }
        ResultNode::Binary { data, name, meta, .. } => {
            let sha256 = sink.upload_file(name, data, &meta.attributes, parent).await?;
            attach_meta(sink, &sha256, meta).await?;
            results.push(UploadedArtifact {
                kind: "binary",
                name: name.clone(),
                tags: meta.tags.clone(),
                sha256: sha256.clone(),
            });
            this_hash = Some(sha256);
        }
        ResultNode::Blob { content, name, blob_type, meta, .. } => {
            let sha256 = sink
                .upload_blob(name, blob_type, content, &meta.attributes, parent)
                .await?;
            attach_meta(sink, &sha256, meta).await?;
            results.push(UploadedArtifact {
                kind: "blob",
                name: format!("{name}_{blob_type}"),
                tags: meta.tags.clone(),
                sha256: sha256.clone(),
            });
            this_hash = Some(sha256);
        }
    }

    for child in node.children() {
        let mut child_results = Box::pin(report_tree(sink, child, this_hash.as_deref(), depth + 1)).await?;
        results.append(&mut child_results);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSink {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArtifactSink for FakeSink {
        async fn upload_config(
            &self,
            _family: &str,
            _config: &Value,
            _config_type: &str,
            _attributes: &Value,
            parent: Option<&str>,
        ) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(format!("config<-{parent:?}"));
            Ok("cfg_sha".to_string())
        }

        async fn upload_file(
            &self,
            _name: &str,
            _content: &[u8],
            _attributes: &Value,
            parent: Option<&str>,
        ) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(format!("file<-{parent:?}"));
            Ok("file_sha".to_string())
        }

        async fn upload_blob(
            &self,
            _name: &str,
            _blob_type: &str,
            _content: &str,
            _attributes: &Value,
            parent: Option<&str>,
        ) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(format!("blob<-{parent:?}"));
            Ok("blob_sha".to_string())
        }

        async fn attach_tag(&self, _sha256: &str, _tag: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn attach_comment(&self, _sha256: &str, _comment: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn uploads_depth_first_parenting_children_off_their_parent_hash() {
        let mut root = ResultNode::root();
        let cfg = root.push_config(serde_json::json!({"type": "demofam"}), "dynamic", None, None, None);
        cfg.push_binary(vec![1, 2, 3], "drop.bin", None, None, None);

        let sink = FakeSink::default();
        let results = report_tree(&sink, &root, None, 0).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, "config");
        assert_eq!(results[1].kind, "binary");

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls[0], "config<-None");
        assert_eq!(calls[1], "file<-Some(\"cfg_sha\")");
    }

    #[tokio::test]
    async fn depth_beyond_limit_is_rejected() {
        let leaf = ResultNode::root();
        let sink = FakeSink::default();
        let err = report_tree(&sink, &leaf, None, MAX_REPORT_DEPTH + 1).await.unwrap_err();
        assert!(matches!(err, ReportError::MaxDepthExceeded));
    }

    #[tokio::test]
    async fn empty_tree_uploads_nothing() {
        let root = ResultNode::root();
        let sink = FakeSink::default();
        let results = report_tree(&sink, &root, None, 0).await.unwrap();
        assert!(results.is_empty());
    }
}
