use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Which variant of forwarding the endpoint performs.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy, Hash, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForwardMode {
  /// Always issue a GET and drop the inbound body.
  GetOnly,
  /// Mirror the inbound method and forward the body of POST requests.
  #[default]
  MirrorMethod,
}

impl ForwardMode {
  /// Value of `Access-Control-Allow-Methods` advertised in this mode.
  pub fn allowed_methods(&self) -> &'static str {
    match self {
      ForwardMode::GetOnly => "GET",
      ForwardMode::MirrorMethod => "GET, POST",
    }
  }
}

impl TryFrom<&str> for ForwardMode {
  type Error = ();

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    match value.to_lowercase().replace('-', "_").as_str() {
      "get_only" | "get" => Ok(ForwardMode::GetOnly),
      "mirror_method" | "mirror" => Ok(ForwardMode::MirrorMethod),
      _ => Err(()),
    }
  }
}

impl Display for ForwardMode {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ForwardMode::GetOnly => f.write_str("get_only"),
      ForwardMode::MirrorMethod => f.write_str("mirror_method"),
    }
  }
}

/// Contents of the optional YAML config file.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct ForwardConfigFile {
  pub path: String,
  pub mode: ForwardMode,
}

impl Default for ForwardConfigFile {
  fn default() -> Self {
    ForwardConfigFile {
      path: String::from("/"),
      mode: ForwardMode::default(),
    }
  }
}

impl ForwardConfigFile {
  pub fn load_from_file<P: AsRef<Path>>(file_name: P) -> Result<ForwardConfigFile, std::io::Error> {
    let content = fs::read_to_string(file_name)?;
    let config = ForwardConfigFile::load_from_str(&content)?;

    Ok(config)
  }

  pub fn load_from_str(content: &str) -> Result<ForwardConfigFile, std::io::Error> {
    serde_yaml::from_str(content).map_err(|err| std::io::Error::new(ErrorKind::Other, err))
  }
}
