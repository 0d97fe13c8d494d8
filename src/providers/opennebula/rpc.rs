use quick_xml::escape::escape;
use reqwest::{Client, header};
use tracing::debug;

use super::models::{OneSource, ROCCI_DOCUMENT_TYPE};
use crate::helpers::xml_tree::{XmlNode, parse_document};
use crate::providers::ProviderError;

/// Pool filter selecting every object the session may see.
const ALL_RESOURCES: i64 = -2;
/// VM state filter selecting every state except `DONE`.
const ANY_LIVE_STATE: i64 = -1;

/// One XML-RPC call parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcParam<'a> {
    Str(&'a str),
    Int(i64),
}

/// Render an XML-RPC `methodCall` document.
pub fn encode_call(method: &str, params: &[RpcParam<'_>]) -> String {
    let mut body = String::from(r#"<?xml version="1.0"?><methodCall>"#);
    body.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for param in params {
        let value = match param {
            RpcParam::Str(s) => format!("<string>{}</string>", escape(*s)),
            RpcParam::Int(i) => format!("<i4>{i}</i4>"),
        };
        body.push_str(&format!("<param><value>{value}</value></param>"));
    }
    body.push_str("</params></methodCall>");
    body
}

fn value_text(value: &XmlNode) -> String {
    // Untyped values are strings; typed ones carry a single child.
    match value.children.first() {
        Some(typed) => typed.text.clone(),
        None => value.text.clone(),
    }
}

/// Decode an OpenNebula `methodResponse`: `[success, body, ...]`. A false
/// success flag or an XML-RPC fault is an error carrying the body text.
pub fn decode_response(method: &str, body: &str) -> Result<String, ProviderError> {
    let rpc_error = |reason: String| ProviderError::Rpc {
        method: method.to_string(),
        reason,
    };

    let root = parse_document(body)?;
    if let Some(fault) = root.child("fault") {
        let reason = fault
            .descend(&["value", "struct"])
            .and_then(|s| {
                s.children_named("member")
                    .find(|m| m.child_text("name") == Some("faultString"))
            })
            .and_then(|m| m.child("value"))
            .map(value_text)
            .unwrap_or_else(|| "XML-RPC fault".to_string());
        return Err(rpc_error(reason));
    }

    let data = root
        .descend(&["params", "param", "value", "array", "data"])
        .ok_or_else(|| rpc_error("response is not an array".to_string()))?;
    let mut values = data.children_named("value");

    let success = values
        .next()
        .map(value_text)
        .ok_or_else(|| rpc_error("empty response".to_string()))?;
    let payload = values.next().map(value_text).unwrap_or_default();

    match success.trim() {
        "1" | "true" => Ok(payload),
        _ => Err(rpc_error(payload)),
    }
}

/// XML-RPC session against `oned`.
#[derive(Debug, Clone)]
pub struct OneRpcClient {
    http: Client,
    endpoint: String,
    auth: String,
}

impl OneRpcClient {
    pub fn new(endpoint: impl Into<String>, auth: impl Into<String>) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(concat!("cloud-info-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            auth: auth.into(),
        })
    }

    async fn call(&self, method: &str, extra: &[RpcParam<'_>]) -> Result<String, ProviderError> {
        let mut params = vec![RpcParam::Str(&self.auth)];
        params.extend_from_slice(extra);
        debug!(%method, endpoint = %self.endpoint, "calling OpenNebula");

        let response = self
            .http
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/xml")
            .body(encode_call(method, &params))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }
        decode_response(method, &response.text().await?)
    }

    fn pool_range() -> [RpcParam<'static>; 3] {
        [
            RpcParam::Int(ALL_RESOURCES),
            RpcParam::Int(-1),
            RpcParam::Int(-1),
        ]
    }
}

#[async_trait::async_trait]
impl OneSource for OneRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn template_pool(&self) -> Result<String, ProviderError> {
        self.call("one.templatepool.info", &Self::pool_range()).await
    }

    async fn image_pool(&self) -> Result<String, ProviderError> {
        self.call("one.imagepool.info", &Self::pool_range()).await
    }

    async fn document_pool(&self) -> Result<String, ProviderError> {
        let [filter, start, end] = Self::pool_range();
        self.call(
            "one.documentpool.info",
            &[filter, start, end, RpcParam::Int(i64::from(ROCCI_DOCUMENT_TYPE))],
        )
        .await
    }

    async fn vm_pool(&self) -> Result<String, ProviderError> {
        let [filter, start, end] = Self::pool_range();
        self.call("one.vmpool.info", &[filter, start, end, RpcParam::Int(ANY_LIVE_STATE)])
            .await
    }
}
