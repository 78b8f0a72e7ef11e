use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::core::render::Value;
use crate::errors::RenderError;

pub mod in_array;

pub use in_array::InArrayFunction;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Text,
    Number,
    List,
    Any(Vec<ParamType>),
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        trace!("ParamType::matches({:?}, {:?})", self, value);
        match self {
            ParamType::Text => matches!(value, Value::Text(_)),
            ParamType::Number => {
                value.as_number().is_some() && !matches!(value, Value::List(_))
            }
            ParamType::List => matches!(value, Value::List(_)),
            ParamType::Any(types) => types.iter().any(|t| t.matches(value)),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Text => write!(f, "Text"),
            ParamType::Number => write!(f, "Number"),
            ParamType::List => write!(f, "List"),
            ParamType::Any(types) => write!(
                f,
                "Any({})",
                types.iter().map(|t| t.to_string()).collect::<Vec<String>>().join(", ")
            ),
        }
    }
}

pub struct ParamSignature {
    pub param_type: ParamType,
    pub name: String,
    pub description: String,
}

/// A function callable from template conditions, e.g. `in_array(...)`.
pub trait TemplateFunction: Send + Sync {
    fn call(&self, args: Vec<Value>) -> Result<Value, RenderError>;

    fn signature(&self) -> (String, Vec<ParamSignature>);

    fn validate_args(&self, args: &[Value]) -> Result<(), String> {
        trace!("TemplateFunction::validate_args({:?})", args);
        let (name, params) = self.signature();

        if args.len() != params.len() {
            return Err(format!(
                "{} expects {} arguments, got {}",
                name,
                params.len(),
                args.len()
            ));
        }

        for (i, (arg, param)) in args.iter().zip(params.iter()).enumerate() {
            if !param.param_type.matches(arg) {
                return Err(format!(
                    "Argument {} ('{}') of {} expected to be of type {}, got {:?}",
                    i, param.name, name, param.param_type, arg
                ));
            }
        }

        Ok(())
    }
}

pub type FunctionRegistry = HashMap<String, Arc<dyn TemplateFunction>>;

pub fn load_functions() -> FunctionRegistry {
    let mut functions = FunctionRegistry::new();
    functions.insert(
        "in_array".to_string(),
        Arc::new(InArrayFunction) as Arc<dyn TemplateFunction>,
    );
    functions
}
