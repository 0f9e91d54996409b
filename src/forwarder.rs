use std::collections::HashMap;

use log::{debug, error};
use serde_json::json;

use crate::forward_config::ForwardMode;
use crate::forwarder::transport::{OutboundRequest, Transport};

pub mod transport;

pub const URL_PARAM: &str = "url";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request as received from the caller, stripped of any host specifics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
  pub method: String,
  pub query_params: HashMap<String, String>,
  pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResponse {
  pub status_code: u16,
  pub headers: Vec<(&'static str, &'static str)>,
  pub body: String,
}

/// Relays an inbound request to the URL named in its `url` query parameter.
///
/// Every outcome, including transport failures, is turned into a
/// `ForwardResponse`; `handle` never fails.
pub struct Forwarder<T> {
  transport: T,
  mode: ForwardMode,
}

impl<T: Transport> Forwarder<T> {
  pub fn new(transport: T, mode: ForwardMode) -> Self {
    Self { transport, mode }
  }

  pub fn mode(&self) -> ForwardMode {
    self.mode
  }

  pub async fn handle(&self, request: InboundRequest) -> ForwardResponse {
    let InboundRequest {
      method,
      mut query_params,
      body,
    } = request;

    let url = match query_params.remove(URL_PARAM) {
      Some(url) if !url.is_empty() => url,
      _ => {
        return self.respond(400, json!({ "error": "Missing \"url\" parameter" }).to_string());
      }
    };

    let outbound = self.outbound_request(method, url, body);
    debug!("Forwarding {} to '{}'", &outbound.method, &outbound.url);

    match self.transport.send(outbound).await {
      Ok(result) => self.respond(result.status_code, result.body_text),
      Err(err) => {
        error!("Proxy failed: {}", err);
        let body = json!({
          "error": "Proxy failed",
          "message": err.to_string(),
        });
        self.respond(500, body.to_string())
      }
    }
  }

  fn outbound_request(&self, method: String, url: String, body: Option<String>) -> OutboundRequest {
    match self.mode {
      ForwardMode::GetOnly => OutboundRequest {
        method: String::from("GET"),
        url,
        headers: Vec::new(),
        body: None,
      },
      ForwardMode::MirrorMethod => {
        let body = if method == "POST" { body } else { None };

        OutboundRequest {
          method,
          url,
          headers: vec![("content-type", FORM_CONTENT_TYPE)],
          body,
        }
      }
    }
  }

  // Upstream bodies are labelled JSON whatever they contain.
  fn respond(&self, status_code: u16, body: String) -> ForwardResponse {
    ForwardResponse {
      status_code,
      headers: vec![
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", self.mode.allowed_methods()),
        ("Access-Control-Allow-Headers", "Content-Type"),
      ],
      body,
    }
  }
}
