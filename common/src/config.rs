use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use hocon::{Hocon, HoconLoader};

/// Loads run configuration from a HOCON file. Environment variables take
/// precedence over file values so individual settings can be overridden
/// without editing the config.
#[derive(Debug)]
pub struct ConfigLoader {
    hocon: Hocon,
    env: HashMap<String, String>,
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let hocon = HoconLoader::new()
            .load_file(path)
            .with_context(|| format!("Failed to find or load config file at: {:?}", path))?
            .hocon()?;

        let env = std::env::vars().collect::<HashMap<_, _>>();

        Ok(Self { hocon, env })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.env.get(name) {
            return Some(Value::String(value.clone()));
        }

        match &self.hocon[name] {
            Hocon::Real(v) => Some(Value::Float(*v as f32)),
            Hocon::Integer(v) => Some(Value::Integer(*v as usize)),
            Hocon::String(v) => Some(Value::String(v.clone())),
            Hocon::Boolean(v) => Some(Value::Boolean(*v)),
            _ => None,
        }
    }

    pub fn load<T: Config>(&self) -> Result<T> {
        T::load(self)
    }
}

#[derive(Debug)]
pub enum Value {
    String(String),
    Integer(usize),
    Float(f32),
    Boolean(bool),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(val) => Some(*val),
            Value::String(val) => val.parse::<bool>().ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Integer(val) => Some(*val),
            Value::String(val) => val.parse::<usize>().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(val) => Some(*val),
            Value::Integer(val) => Some(*val as f32),
            Value::String(val) => val.parse::<f32>().ok(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(val) => Some(val.clone()),
            Value::Boolean(val) => Some(val.to_string()),
            Value::Float(val) => Some(val.to_string()),
            Value::Integer(val) => Some(val.to_string()),
        }
    }
}

/// Implemented by options structs that know their own defaults.
pub trait Config {
    fn load(config: &ConfigLoader) -> Result<Self>
    where
        Self: Sized;
}
