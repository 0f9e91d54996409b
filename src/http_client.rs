use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

pub const DEFAULT_REDIRECT_LIMIT: usize = 20;

/// Settings for the client that performs outbound forwards.
///
/// The client holds no cookie store, so nothing set by one upstream response
/// reaches another caller's request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamClientConfig {
  pub http_proxy: Option<String>,
  pub user: Option<String>,
  pub pass: Option<String>,
  pub redirect_limit: usize,
  /// `None` keeps reqwest's default, which never times out.
  pub timeout: Option<Duration>,
}

impl Default for UpstreamClientConfig {
  fn default() -> Self {
    UpstreamClientConfig {
      http_proxy: None,
      user: None,
      pass: None,
      redirect_limit: DEFAULT_REDIRECT_LIMIT,
      timeout: None,
    }
  }
}

impl UpstreamClientConfig {
  pub fn to_client(self) -> Result<Client, reqwest::Error> {
    let UpstreamClientConfig {
      http_proxy,
      user,
      pass,
      redirect_limit,
      timeout,
    } = self;
    let mut client_builder = reqwest::ClientBuilder::new();

    if let Some(proxy_url) = http_proxy {
      let mut proxy = reqwest::Proxy::all(proxy_url)?;

      if let (Some(user_name), Some(password)) = (user, pass) {
        proxy = proxy.basic_auth(&user_name, &password);
      }

      client_builder = client_builder.proxy(proxy);
    }

    if let Some(timeout) = timeout {
      client_builder = client_builder.timeout(timeout);
    }

    let client = client_builder.redirect(Policy::limited(redirect_limit)).build()?;

    Ok(client)
  }
}
