mod forward_config;
mod forward_service;
mod forwarder;
mod http_client;
mod std_logger;

use std::env;
use std::io::{ErrorKind, Result};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::{info, LevelFilter};

use crate::forward_config::{ForwardConfigFile, ForwardMode};
use crate::forward_service::forward_factory::ForwardServiceFactory;
use crate::forwarder::transport::ReqwestTransport;
use crate::forwarder::Forwarder;
use crate::http_client::{UpstreamClientConfig, DEFAULT_REDIRECT_LIMIT};

/// Relays requests to the URL given in the `url` query parameter.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
  /// YAML file with `path` and `mode` keys
  #[arg(long)]
  config: Option<String>,
  #[arg(long)]
  bind: Option<String>,
  #[arg(long)]
  port: Option<u16>,
  #[arg(long)]
  workers: Option<usize>,
  /// `get_only` or `mirror_method`
  #[arg(long, value_parser = parse_mode)]
  mode: Option<ForwardMode>,
  /// Path the forwarder is mounted at
  #[arg(long)]
  path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Config {
  port: u16,
  worker_count: usize,
  bind: String,
  config_file: Option<String>,
  forward_path: Option<String>,
  forward_mode: Option<ForwardMode>,
  log_level: LevelFilter,
  client: UpstreamClientConfig,
}

#[actix_web::main]
async fn main() -> Result<()> {
  let mut config = read_env_vars();
  config.apply_cli(Cli::parse());

  std_logger::init(config.log_level).map_err(|err| std::io::Error::new(ErrorKind::Other, err))?;

  let forward_config = load_forward_config(&config)?;
  let http_client = config
    .client
    .clone()
    .to_client()
    .map_err(|err| std::io::Error::new(ErrorKind::Other, err))?;

  let forwarder = Arc::new(Forwarder::new(ReqwestTransport::new(http_client), forward_config.mode));
  info!(
    "Forwarding at '{}' in {} mode on {}:{}.",
    &forward_config.path,
    forwarder.mode(),
    &config.bind,
    config.port
  );

  let path = forward_config.path;

  HttpServer::new(move || {
    let factory = ForwardServiceFactory::create(forwarder.clone());
    App::new().service(web::service(path.as_str()).finish(factory))
  })
  .workers(config.worker_count)
  .bind((config.bind, config.port))?
  .run()
  .await
}

fn parse_mode(value: &str) -> std::result::Result<ForwardMode, String> {
  ForwardMode::try_from(value).map_err(|_| format!("unknown forward mode '{}'", value))
}

fn read_env_vars() -> Config {
  config_from(|key| env::var(key).ok())
}

fn config_from<F>(lookup: F) -> Config
where
  F: Fn(&str) -> Option<String>,
{
  const DEFAULT_PORT: u16 = 8080;
  const DEFAULT_WORKER_COUNT: usize = 4;
  const DEFAULT_BIND: &str = "0.0.0.0";

  let bind = lookup("HTTP_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
  let port = lookup("HTTP_PORT").map_or(DEFAULT_PORT, |e| e.parse::<u16>().unwrap_or(DEFAULT_PORT));
  let worker_count = lookup("HTTP_WORKER_COUNT").map_or(DEFAULT_WORKER_COUNT, |e| {
    e.parse::<usize>().unwrap_or(DEFAULT_WORKER_COUNT)
  });
  let redirect_limit = lookup("UPSTREAM_REDIRECT_LIMIT").map_or(DEFAULT_REDIRECT_LIMIT, |e| {
    e.parse::<usize>().unwrap_or(DEFAULT_REDIRECT_LIMIT)
  });
  let timeout = lookup("UPSTREAM_TIMEOUT_SECS")
    .and_then(|e| e.parse::<u64>().ok())
    .map(Duration::from_secs);
  let log_level = lookup("LOG_LEVEL")
    .and_then(|e| std_logger::parse_level(&e))
    .unwrap_or(std_logger::DEFAULT_LEVEL);

  Config {
    port,
    worker_count,
    bind,
    config_file: lookup("FORWARDER_CONFIG"),
    forward_path: lookup("FORWARD_PATH"),
    forward_mode: lookup("FORWARD_MODE").and_then(|e| ForwardMode::try_from(e.as_str()).ok()),
    log_level,
    client: UpstreamClientConfig {
      http_proxy: lookup("HTTP_PROXY_URL"),
      user: lookup("HTTP_PROXY_USER"),
      pass: lookup("HTTP_PROXY_PASS"),
      redirect_limit,
      timeout,
    },
  }
}

impl Config {
  fn apply_cli(&mut self, cli: Cli) {
    let Cli {
      config,
      bind,
      port,
      workers,
      mode,
      path,
    } = cli;

    if config.is_some() {
      self.config_file = config;
    }
    if let Some(bind) = bind {
      self.bind = bind;
    }
    if let Some(port) = port {
      self.port = port;
    }
    if let Some(workers) = workers {
      self.worker_count = workers;
    }
    if mode.is_some() {
      self.forward_mode = mode;
    }
    if path.is_some() {
      self.forward_path = path;
    }
  }
}

fn load_forward_config(config: &Config) -> Result<ForwardConfigFile> {
  let mut forward_config = match &config.config_file {
    Some(file_name) => ForwardConfigFile::load_from_file(file_name)?,
    None => ForwardConfigFile::default(),
  };

  if let Some(path) = &config.forward_path {
    forward_config.path = path.clone();
  }

  if let Some(mode) = config.forward_mode {
    forward_config.mode = mode;
  }

  Ok(forward_config)
}
