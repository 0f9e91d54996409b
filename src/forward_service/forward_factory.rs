use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use futures_core::future::LocalBoxFuture;

use crate::forward_service::forward_route_service::ForwardRouteService;
use crate::forwarder::transport::Transport;
use crate::forwarder::Forwarder;

pub struct ForwardServiceFactory<T> {
  pub forwarder: Arc<Forwarder<T>>,
}

impl<T: Transport + 'static> ServiceFactory<ServiceRequest> for ForwardServiceFactory<T> {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Config = ();
  type Service = ForwardRouteService<T>;
  type InitError = ();
  type Future = LocalBoxFuture<'static, Result<Self::Service, Self::InitError>>;

  fn new_service(&self, _: Self::Config) -> Self::Future {
    let service = ForwardRouteService {
      forwarder: self.forwarder.clone(),
    };

    Box::pin(async move { Ok(service) })
  }
}

impl<T> ForwardServiceFactory<T> {
  pub fn create(forwarder: Arc<Forwarder<T>>) -> Self {
    Self { forwarder }
  }
}
