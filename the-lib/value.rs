//! Dynamic values passed through commands, hooks and the variable store.

use std::fmt;

use indexmap::IndexMap;
use serde::{
  Deserialize,
  Serialize,
};

pub type ValueMap = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Nil,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  List(Vec<Value>),
  Map(ValueMap),
}

impl Value {
  pub fn is_nil(&self) -> bool {
    matches!(self, Self::Nil)
  }

  pub fn is_truthy(&self) -> bool {
    match self {
      Self::Nil => false,
      Self::Bool(b) => *b,
      _ => true,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s),
      _ => None,
    }
  }

  /// Integer view, accepting numeric strings the way typed arguments
  /// arrive from the shell.
  pub fn as_int(&self) -> Option<i64> {
    match self {
      Self::Int(i) => Some(*i),
      Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
      Self::Str(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  pub fn as_float(&self) -> Option<f64> {
    match self {
      Self::Int(i) => Some(*i as f64),
      Self::Float(f) => Some(*f),
      Self::Str(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Nil => "nil",
      Self::Bool(_) => "bool",
      Self::Int(_) => "int",
      Self::Float(_) => "float",
      Self::Str(_) => "string",
      Self::List(_) => "list",
      Self::Map(_) => "map",
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Nil => f.write_str("nil"),
      Self::Bool(b) => write!(f, "{b}"),
      Self::Int(i) => write!(f, "{i}"),
      Self::Float(x) => write!(f, "{x}"),
      Self::Str(s) => f.write_str(s),
      Self::List(items) => {
        f.write_str("[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{item}")?;
        }
        f.write_str("]")
      },
      Self::Map(map) => {
        f.write_str("{")?;
        for (i, (key, value)) in map.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
      },
    }
  }
}

impl From<()> for Value {
  fn from(_: ()) -> Self {
    Self::Nil
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Self::Int(value)
  }
}

impl From<usize> for Value {
  fn from(value: usize) -> Self {
    Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Self::Float(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::Str(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::Str(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(value: Vec<T>) -> Self {
    Self::List(value.into_iter().map(Into::into).collect())
  }
}

impl From<ValueMap> for Value {
  fn from(value: ValueMap) -> Self {
    Self::Map(value)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map_or(Self::Nil, Into::into)
  }
}
