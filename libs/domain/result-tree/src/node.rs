// [libs/domain/result-tree/src/node.rs]
//! In-memory shape of a task's result tree, built by a module while it
//! runs and handed to the reporter for upload once the task finishes.

use serde_json::Value;

use crate::errors::ReportError;

/// Metadata every non-root node carries to the artifact store.
#[derive(Debug, Clone, Default)]
pub struct NodeMeta {
    pub tags: Vec<String>,
    pub attributes: Value,
    pub comments: Vec<String>,
}

impl NodeMeta {
    fn new(tags: Option<Vec<String>>, attributes: Option<Value>, comments: Option<Vec<String>>) -> Self {
        NodeMeta {
            tags: tags.unwrap_or_default(),
            attributes: attributes.unwrap_or_else(|| Value::Object(Default::default())),
            comments: comments.unwrap_or_default(),
        }
    }
}

/// One node of a result tree. `Generic` nodes carry no payload of their
/// own and exist purely to group children — the tree root is always a
/// `Generic` node.
#[derive(Debug, Clone)]
pub enum ResultNode {
    Generic {
        children: Vec<ResultNode>,
    },
    Config {
        config: Value,
        config_type: String,
        meta: NodeMeta,
        children: Vec<ResultNode>,
    },
    Binary {
        data: Vec<u8>,
        name: String,
        meta: NodeMeta,
        children: Vec<ResultNode>,
    },
    Blob {
        content: String,
        name: String,
        blob_type: String,
        meta: NodeMeta,
        children: Vec<ResultNode>,
    },
}

impl Default for ResultNode {
    fn default() -> Self {
        ResultNode::Generic { children: Vec::new() }
    }
}

impl ResultNode {
    pub fn root() -> Self {
        ResultNode::default()
    }

    fn children_mut(&mut self) -> &mut Vec<ResultNode> {
        match self {
            ResultNode::Generic { children }
            | ResultNode::Config { children, .. }
            | ResultNode::Binary { children, .. }
            | ResultNode::Blob { children, .. } => children,
        }
    }

    pub fn children(&self) -> &[ResultNode] {
        match self {
            ResultNode::Generic { children }
            | ResultNode::Config { children, .. }
            | ResultNode::Binary { children, .. }
            | ResultNode::Blob { children, .. } => children,
        }
    }

    /// Appends a config result and returns a mutable handle to it so
    /// further children can be nested under it.
    pub fn push_config(
        &mut self,
        config: Value,
        config_type: impl Into<String>,
        tags: Option<Vec<String>>,
        attributes: Option<Value>,
        comments: Option<Vec<String>>,
    ) -> &mut ResultNode {
        let node = ResultNode::Config {
            config,
            config_type: config_type.into(),
            meta: NodeMeta::new(tags, attributes, comments),
            children: Vec::new(),
        };
        let children = self.children_mut();
        children.push(node);
        children.last_mut().expect("just pushed")
    }

    pub fn push_binary(
        &mut self,
        data: Vec<u8>,
        name: impl Into<String>,
        tags: Option<Vec<String>>,
        attributes: Option<Value>,
        comments: Option<Vec<String>>,
    ) -> &mut ResultNode {
        let node = ResultNode::Binary {
            data,
            name: name.into(),
            meta: NodeMeta::new(tags, attributes, comments),
            children: Vec::new(),
        };
        let children = self.children_mut();
        children.push(node);
        children.last_mut().expect("just pushed")
    }

    pub fn push_blob(
        &mut self,
        content: impl Into<String>,
        name: impl Into<String>,
        blob_type: impl Into<String>,
        tags: Option<Vec<String>>,
        attributes: Option<Value>,
        comments: Option<Vec<String>>,
    ) -> &mut ResultNode {
        let node = ResultNode::Blob {
            content: content.into(),
            name: name.into(),
            blob_type: blob_type.into(),
            meta: NodeMeta::new(tags, attributes, comments),
            children: Vec::new(),
        };
        let children = self.children_mut();
        children.push(node);
        children.last_mut().expect("just pushed")
    }

    pub fn is_empty_tree(&self) -> bool {
        matches!(self, ResultNode::Generic { children } if children.is_empty())
    }

    /// Serializes the node and all of its descendants into the
    /// json-dumpable shape the artifact uploader and any debug tooling
    /// expects, mirroring the source tree's `to_dict_recursive`.
    pub fn to_transport(&self) -> Value {
        use base64::Engine as _;
        let (mut dict, children) = match self {
            ResultNode::Generic { children } => (serde_json::json!({ "object": "object" }), children),
            ResultNode::Config { config, config_type, meta, children } => (
                serde_json::json!({
                    "object": "config",
                    "config": config,
                    "config_type": config_type,
                    "tags": meta.tags,
                    "attributes": meta.attributes,
                    "comments": meta.comments,
                }),
                children,
            ),
            ResultNode::Binary { data, name, meta, children } => (
                serde_json::json!({
                    "object": "binary",
                    "data": base64::engine::general_purpose::STANDARD.encode(data),
                    "name": name,
                    "tags": meta.tags,
                    "attributes": meta.attributes,
                    "comments": meta.comments,
                }),
                children,
            ),
            ResultNode::Blob { content, name, blob_type, meta, children } => (
                serde_json::json!({
                    "object": "blob",
                    "content": content,
                    "blob_type": blob_type,
                    "name": name,
                    "tags": meta.tags,
                    "attributes": meta.attributes,
                    "comments": meta.comments,
                }),
                children,
            ),
        };
        dict["children"] = Value::Array(children.iter().map(ResultNode::to_transport).collect());
        dict
    }

    /// Rebuilds a `ResultNode` from its `to_transport()` form. The
    /// executor runs in-process with the module and hands the reporter
    /// a job crossing the `track`/`report` broker boundary as plain
    /// JSON (`ExecuteOutcome::Finished.result_tree`), so the reporter
    /// needs the inverse of `to_transport` to walk it with
    /// `report_tree`.
    pub fn from_transport(value: &Value) -> Result<ResultNode, ReportError> {
        let object = value
            .as_object()
            .ok_or_else(|| ReportError::MalformedTransport("node is not a JSON object".to_string()))?;
        let kind = object
            .get("object")
            .and_then(Value::as_str)
            .ok_or_else(|| ReportError::MalformedTransport("node missing 'object' discriminant".to_string()))?;

        let raw_children = object.get("children").and_then(Value::as_array).cloned().unwrap_or_default();
        let children = raw_children.iter().map(ResultNode::from_transport).collect::<Result<Vec<_>, _>>()?;

        let string_field = |key: &str| -> Result<String, ReportError> {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ReportError::MalformedTransport(format!("node missing '{key}'")))
        };
        let meta = NodeMeta {
            tags: object
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            attributes: object.get("attributes").cloned().unwrap_or_else(|| Value::Object(Default::default())),
            comments: object
                .get("comments")
                .and_then(Value::as_array)
                .map(|comments| comments.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
        };

        match kind {
            "object" => Ok(ResultNode::Generic { children }),
            "config" => Ok(ResultNode::Config {
                config: object.get("config").cloned().unwrap_or(Value::Null),
                config_type: string_field("config_type")?,
                meta,
                children,
            }),
            "binary" => {
                use base64::Engine as _;
                let encoded = string_field("data")?;
                let data = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| ReportError::MalformedTransport(format!("invalid base64 in 'data': {e}")))?;
                Ok(ResultNode::Binary { data, name: string_field("name")?, meta, children })
            }
            "blob" => Ok(ResultNode::Blob {
                content: string_field("content")?,
                name: string_field("name")?,
                blob_type: string_field("blob_type")?,
                meta,
                children,
            }),
            other => Err(ReportError::MalformedTransport(format!("unrecognized node kind '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_root_is_an_empty_tree() {
        assert!(ResultNode::root().is_empty_tree());
    }

    #[test]
    fn pushing_a_child_makes_the_tree_non_empty() {
        let mut root = ResultNode::root();
        root.push_blob("data", "cfg", "dyn_cfg", None, None, None);
        assert!(!root.is_empty_tree());
    }

    #[test]
    fn transport_shape_carries_tags_and_nested_children() {
        let mut root = ResultNode::root();
        let cfg = root.push_config(
            serde_json::json!({"type": "demofam"}),
            "dynamic",
            Some(vec!["demofam".into()]),
            None,
            None,
        );
        cfg.push_binary(vec![1, 2, 3], "drop.bin", None, None, None);

        let transport = root.to_transport();
        assert_eq!(transport["object"], "object");
        let child = &transport["children"][0];
        assert_eq!(child["object"], "config");
        assert_eq!(child["tags"][0], "demofam");
        let grandchild = &child["children"][0];
        assert_eq!(grandchild["object"], "binary");
        assert_eq!(grandchild["name"], "drop.bin");
    }

    #[test]
    fn from_transport_round_trips_a_nested_tree() {
        let mut root = ResultNode::root();
        let cfg = root.push_config(
            serde_json::json!({"type": "demofam"}),
            "dynamic",
            Some(vec!["demofam".into()]),
            None,
            None,
        );
        cfg.push_binary(vec![1, 2, 3], "drop.bin", Some(vec!["dropped".into()]), None, None);

        let transport = root.to_transport();
        let rebuilt = ResultNode::from_transport(&transport).unwrap();

        assert!(matches!(rebuilt, ResultNode::Generic { .. }));
        assert_eq!(rebuilt.children().len(), 1);
        let ResultNode::Config { config_type, children, .. } = &rebuilt.children()[0] else {
            panic!("expected config node");
        };
        assert_eq!(config_type, "dynamic");
        let ResultNode::Binary { data, name, .. } = &children[0] else {
            panic!("expected binary node");
        };
        assert_eq!(data, &vec![1, 2, 3]);
        assert_eq!(name, "drop.bin");
    }

    #[test]
    fn from_transport_rejects_unrecognized_kind() {
        let err = ResultNode::from_transport(&serde_json::json!({"object": "mystery", "children": []})).unwrap_err();
        assert!(matches!(err, ReportError::MalformedTransport(_)));
    }
}
