// [libs/infra/artifact-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: MWDB ARTIFACT STORE UPLINK
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: PERSISTIR EL ARBOL DE RESULTADOS EN EL ALMACEN
 *
 * Traduce las operaciones de `ArtifactSink` (config/file/blob upload,
 * tag, comment) al API REST de un almacen de artefactos estilo mwdb.
 * La autenticacion es un Bearer token fijo, resuelto una sola vez por
 * `TrackerConfig::mwdb` y compartido entre todas las tareas.
 * =================================================================
 */

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mtracker_domain_result_tree::ArtifactSink;
use reqwest::{multipart, Client, StatusCode};
use serde_json::Value;

use crate::errors::ArtifactClientError;

pub struct MwdbArtifactClient {
    http: Client,
    api_url: String,
    token: String,
}

impl MwdbArtifactClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        MwdbArtifactClient { http: Client::new(), api_url: api_url.into().trim_end_matches('/').to_string(), token: token.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ArtifactClientError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ArtifactClientError::Request(self.api_url.clone(), e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ArtifactClientError::Request(self.api_url.clone(), e))?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(ArtifactClientError::Rejected { status: status.as_u16(), body });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn sha256_of(payload: &Value) -> Result<String, ArtifactClientError> {
        payload
            .get("sha256")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ArtifactClientError::MissingField("sha256"))
    }

    /// Looks up a previously ingested config by its own content hash,
    /// used opportunistically by `mtracker-apps-fetch --out db` to skip
    /// a redundant upload of a config already on file.
    pub async fn query_config(&self, hash: &str) -> Result<Option<Value>, ArtifactClientError> {
        let response = self
            .http
            .get(self.url(&format!("/config/{hash}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ArtifactClientError::Request(self.api_url.clone(), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let body = response.text().await.map_err(|e| ArtifactClientError::Request(self.api_url.clone(), e))?;
        if status != StatusCode::OK {
            return Err(ArtifactClientError::Rejected { status: status.as_u16(), body });
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl ArtifactSink for MwdbArtifactClient {
    async fn upload_config(
        &self,
        family: &str,
        config: &Value,
        config_type: &str,
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "family": family,
            "cfg": config,
            "config_type": config_type,
            "attributes": attributes,
            "parent": parent,
        });
        let request = self.http.post(self.url("/config")).json(&body);
        let response = self.send_json(request).await?;
        Ok(Self::sha256_of(&response)?)
    }

    async fn upload_file(
        &self,
        name: &str,
        content: &[u8],
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String> {
        let mut form = multipart::Form::new()
            .part("file", multipart::Part::bytes(content.to_vec()).file_name(name.to_string()))
            .text("attributes", attributes.to_string());
        if let Some(parent) = parent {
            form = form.text("parent", parent.to_string());
        }

        let request = self.http.post(self.url("/file")).multipart(form);
        let response = self.send_json(request).await?;
        Ok(Self::sha256_of(&response)?)
    }

    async fn upload_blob(
        &self,
        name: &str,
        blob_type: &str,
        content: &str,
        attributes: &Value,
        parent: Option<&str>,
    ) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "name": name,
            "type": blob_type,
            "content": content,
            "content_base64": STANDARD.encode(content),
            "attributes": attributes,
            "parent": parent,
        });
        let request = self.http.post(self.url("/blob")).json(&body);
        let response = self.send_json(request).await?;
        Ok(Self::sha256_of(&response)?)
    }

    async fn attach_tag(&self, sha256: &str, tag: &str) -> anyhow::Result<()> {
        let request = self.http.put(self.url(&format!("/object/{sha256}/tag"))).json(&serde_json::json!({ "tag": tag }));
        self.send_json(request).await?;
        Ok(())
    }

    async fn attach_comment(&self, sha256: &str, comment: &str) -> anyhow::Result<()> {
        let request =
            self.http.post(self.url(&format!("/object/{sha256}/comment"))).json(&serde_json::json!({ "comment": comment }));
        self.send_json(request).await?;
        Ok(())
    }
}
