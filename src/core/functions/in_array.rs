use crate::core::render::Value;
use crate::errors::RenderError;

use super::{ParamSignature, ParamType, TemplateFunction};

/// `in_array(needle, $redcap['checkbox'])`: is the label among the selected choices?
pub struct InArrayFunction;

impl TemplateFunction for InArrayFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, RenderError> {
        let [needle, haystack] = args.as_slice() else {
            return Err(RenderError::FunctionArgs(format!(
                "in_array expects 2 arguments, got {}",
                args.len()
            )));
        };

        let needle = needle.to_string();
        let found = match haystack {
            Value::List(items) => items.iter().any(|item| *item == needle),
            other => other.to_string() == needle,
        };
        Ok(Value::Boolean(found))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let needle = ParamSignature {
            param_type: ParamType::Any(vec![ParamType::Text, ParamType::Number]),
            name: "needle".to_string(),
            description: "The choice label to look for".to_string(),
        };

        let haystack = ParamSignature {
            param_type: ParamType::Any(vec![ParamType::List, ParamType::Text]),
            name: "haystack".to_string(),
            description: "The checkbox field to search".to_string(),
        };

        ("in_array".to_string(), vec![needle, haystack])
    }
}
