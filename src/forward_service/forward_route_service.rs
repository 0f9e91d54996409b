use std::sync::Arc;

use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse};
use actix_web::{HttpRequest, ResponseError};
use bytes::BytesMut;
use futures_core::future::LocalBoxFuture;
use futures_core::Stream;
use futures_util::StreamExt;
use log::{debug, error};

use crate::forward_service::inbound_request;
use crate::forwarder::transport::Transport;
use crate::forwarder::Forwarder;

pub struct ForwardRouteService<T> {
  pub(super) forwarder: Arc<Forwarder<T>>,
}

impl<T: Transport + 'static> Service<ServiceRequest> for ForwardRouteService<T> {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  dev::always_ready!();

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let (http_request, payload) = req.into_parts();
    let forwarder = self.forwarder.clone();

    Box::pin(Self::exec(forwarder, http_request, payload))
  }
}

impl<T: Transport + 'static> ForwardRouteService<T> {
  async fn exec(
    forwarder: Arc<Forwarder<T>>,
    http: HttpRequest,
    mut payload: Payload,
  ) -> Result<ServiceResponse, actix_web::Error> {
    let (size, _) = payload.size_hint();
    let mut body_buffer = BytesMut::with_capacity(size);

    while let Some(chunk) = payload.next().await {
      match chunk {
        Ok(bytes) => {
          body_buffer.extend_from_slice(&bytes);
        }
        Err(err) => {
          error!("Reading inbound body failed {}", err);
          let error_response = err.error_response();
          return Ok(ServiceResponse::new(http, error_response));
        }
      }
    }

    let inbound = inbound_request(&http, body_buffer.freeze());
    let response = forwarder.handle(inbound).await;
    debug!("{} {} answered {}", http.method(), http.path(), response.status_code);

    Ok(ServiceResponse::new(http, response.into()))
  }
}
