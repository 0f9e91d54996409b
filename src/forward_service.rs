use std::collections::HashMap;

use actix_web::http::StatusCode;
use actix_web::web::{Bytes, Query};
use actix_web::{HttpRequest, HttpResponse};
use log::warn;

use crate::forwarder::{ForwardResponse, InboundRequest};

pub mod forward_factory;
pub mod forward_route_service;

/// Builds the host-independent request from an actix request head and its collected body.
pub fn inbound_request(source_request: &HttpRequest, body: Bytes) -> InboundRequest {
  let query = source_request.query_string();
  let query_params = match Query::<HashMap<String, String>>::from_query(query) {
    Ok(query_params) => query_params.into_inner(),
    Err(err) => {
      warn!("Unable to parse query parameters {}", err);
      HashMap::new()
    }
  };

  let body = if body.is_empty() {
    None
  } else {
    Some(String::from_utf8_lossy(&body).into_owned())
  };

  InboundRequest {
    method: source_request.method().to_string(),
    query_params,
    body,
  }
}

impl From<ForwardResponse> for HttpResponse {
  fn from(response: ForwardResponse) -> Self {
    let ForwardResponse {
      status_code,
      headers,
      body,
    } = response;

    let status = StatusCode::from_u16(status_code).unwrap_or_else(|_| {
      warn!("Upstream status {} cannot be represented, answering 502", status_code);
      StatusCode::BAD_GATEWAY
    });

    let mut builder = HttpResponse::build(status);

    for header in headers {
      builder.insert_header(header);
    }

    builder.body(body)
  }
}
