use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use thiserror::Error;

/// A request the forwarder wants sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
  pub method: String,
  pub url: String,
  pub headers: Vec<(&'static str, &'static str)>,
  pub body: Option<String>,
}

/// Status and fully read body text of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResult {
  pub status_code: u16,
  pub body_text: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("invalid HTTP method \"{0}\"")]
  InvalidMethod(String),
  #[error(transparent)]
  Request(#[from] reqwest::Error),
}

#[async_trait(?Send)]
pub trait Transport {
  async fn send(&self, request: OutboundRequest) -> Result<OutboundResult, TransportError>;
}

pub struct ReqwestTransport {
  http_client: Client,
}

impl ReqwestTransport {
  pub fn new(http_client: Client) -> Self {
    Self { http_client }
  }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
  async fn send(&self, request: OutboundRequest) -> Result<OutboundResult, TransportError> {
    let OutboundRequest {
      method,
      url,
      headers,
      body,
    } = request;

    let method = Method::from_bytes(method.as_bytes())
      .map_err(|_| TransportError::InvalidMethod(method.clone()))?;

    let mut builder = self.http_client.request(method, url.as_str());

    for (name, value) in headers {
      builder = builder.header(name, value);
    }

    if let Some(body) = body {
      builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status_code = response.status().as_u16();
    debug!("Upstream {} answered {}", &url, status_code);

    let body_text = response.text().await?;

    Ok(OutboundResult {
      status_code,
      body_text,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::forward_config::ForwardMode;
  use crate::forwarder::{Forwarder, InboundRequest, URL_PARAM};
  use crate::http_client::UpstreamClientConfig;
  use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
  use serde_json::Value;
  use std::collections::HashMap;
  use std::net::SocketAddr;
  use std::time::Duration;

  async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let content_type = req
      .headers()
      .get("content-type")
      .and_then(|value| value.to_str().ok())
      .unwrap_or("-")
      .to_string();

    HttpResponse::Ok().body(format!(
      "{} {} {}",
      req.method(),
      content_type,
      String::from_utf8_lossy(&body)
    ))
  }

  async fn unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().body("try later")
  }

  async fn hop(left: web::Path<u32>) -> HttpResponse {
    match left.into_inner() {
      0 => HttpResponse::Ok().body("arrived"),
      left => HttpResponse::Found()
        .insert_header(("Location", format!("/hop/{}", left - 1)))
        .finish(),
    }
  }

  async fn session(req: HttpRequest) -> HttpResponse {
    let seen = req
      .headers()
      .get("cookie")
      .and_then(|value| value.to_str().ok())
      .unwrap_or("-")
      .to_string();

    HttpResponse::Ok()
      .insert_header(("Set-Cookie", "sid=callerA; Path=/"))
      .body(seen)
  }

  async fn slow() -> HttpResponse {
    actix_web::rt::time::sleep(Duration::from_secs(3)).await;
    HttpResponse::Ok().body("late")
  }

  fn start_upstream() -> SocketAddr {
    let server = HttpServer::new(|| {
      App::new()
        .route("/echo", web::route().to(echo))
        .route("/down", web::get().to(unavailable))
        .route("/hop/{left}", web::get().to(hop))
        .route("/session", web::get().to(session))
        .route("/slow", web::get().to(slow))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
  }

  fn transport() -> ReqwestTransport {
    ReqwestTransport::new(UpstreamClientConfig::default().to_client().unwrap())
  }

  fn forwarder(config: UpstreamClientConfig) -> Forwarder<ReqwestTransport> {
    let transport = ReqwestTransport::new(config.to_client().unwrap());
    Forwarder::new(transport, ForwardMode::MirrorMethod)
  }

  fn get(url: String) -> InboundRequest {
    InboundRequest {
      method: String::from("GET"),
      query_params: HashMap::from([(URL_PARAM.to_string(), url)]),
      body: None,
    }
  }

  fn request(method: &str, url: String, body: Option<&str>) -> OutboundRequest {
    OutboundRequest {
      method: method.into(),
      url,
      headers: vec![("content-type", "application/x-www-form-urlencoded")],
      body: body.map(String::from),
    }
  }

  #[actix_web::test]
  async fn sends_method_headers_and_body() {
    let addr = start_upstream();
    let url = format!("http://{}/echo", addr);

    let result = transport()
      .send(request("POST", url, Some("a=1&b=2")))
      .await
      .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body_text, "POST application/x-www-form-urlencoded a=1&b=2");
  }

  #[actix_web::test]
  async fn error_statuses_are_results_not_failures() {
    let addr = start_upstream();
    let url = format!("http://{}/down", addr);

    let result = transport().send(request("GET", url, None)).await.unwrap();

    assert_eq!(result.status_code, 503);
    assert_eq!(result.body_text, "try later");
  }

  #[actix_web::test]
  async fn unparsable_method_fails_before_sending() {
    let err = transport()
      .send(request("NOT A VERB", "http://127.0.0.1:1/".into(), None))
      .await
      .unwrap_err();

    assert!(matches!(err, TransportError::InvalidMethod(_)));
    assert_eq!(err.to_string(), "invalid HTTP method \"NOT A VERB\"");
  }

  #[actix_web::test]
  async fn unreachable_host_is_a_request_failure() {
    let err = transport()
      .send(request("GET", "http://127.0.0.1:1/".into(), None))
      .await
      .unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
  }

  #[actix_web::test]
  async fn malformed_url_is_a_request_failure() {
    let err = transport()
      .send(request("GET", "not a url".into(), None))
      .await
      .unwrap_err();

    assert!(matches!(err, TransportError::Request(_)));
  }

  #[actix_web::test]
  async fn redirect_chain_resolves_to_final_response() {
    let addr = start_upstream();
    let forwarder = forwarder(UpstreamClientConfig::default());

    for hops in [1, 5, 6, 12] {
      let response = forwarder.handle(get(format!("http://{}/hop/{}", addr, hops))).await;

      assert_eq!(response.status_code, 200, "{} hops", hops);
      assert_eq!(response.body, "arrived");
    }
  }

  #[actix_web::test]
  async fn redirects_past_the_limit_are_proxy_failures() {
    let addr = start_upstream();
    let forwarder = forwarder(UpstreamClientConfig {
      redirect_limit: 2,
      ..UpstreamClientConfig::default()
    });

    let response = forwarder.handle(get(format!("http://{}/hop/3", addr))).await;

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["error"], "Proxy failed");
    assert!(body["message"].as_str().unwrap().contains("too many redirects"));
  }

  #[actix_web::test]
  async fn upstream_cookies_do_not_reach_later_callers() {
    let addr = start_upstream();
    let forwarder = forwarder(UpstreamClientConfig::default());
    let url = format!("http://{}/session", addr);

    let first = forwarder.handle(get(url.clone())).await;
    let second = forwarder.handle(get(url)).await;

    assert_eq!(first.body, "-");
    assert_eq!(second.body, "-");
    assert_eq!(first, second);
  }

  #[actix_web::test]
  async fn slow_upstream_times_out() {
    let addr = start_upstream();
    let config = UpstreamClientConfig {
      timeout: Some(Duration::from_millis(500)),
      ..UpstreamClientConfig::default()
    };
    let transport = ReqwestTransport::new(config.to_client().unwrap());

    let err = transport
      .send(request("GET", format!("http://{}/slow", addr), None))
      .await
      .unwrap_err();

    match err {
      TransportError::Request(err) => assert!(err.is_timeout()),
      other => panic!("unexpected error {:?}", other),
    }
  }

  #[actix_web::test]
  async fn timeout_surfaces_as_proxy_failed() {
    let addr = start_upstream();
    let forwarder = forwarder(UpstreamClientConfig {
      timeout: Some(Duration::from_millis(500)),
      ..UpstreamClientConfig::default()
    });
    let url = format!("http://{}/slow", addr);

    let response = forwarder.handle(get(url.clone())).await;

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["error"], "Proxy failed");
    assert!(body["message"].as_str().unwrap().contains(&url));
  }

  #[actix_web::test]
  async fn unreachable_upstream_message_names_the_target() {
    let forwarder = forwarder(UpstreamClientConfig::default());

    let response = forwarder.handle(get(String::from("http://127.0.0.1:1/"))).await;

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["error"], "Proxy failed");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("error sending request"));
    assert!(message.contains("http://127.0.0.1:1/"));
  }
}
