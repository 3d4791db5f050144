use std::collections::BTreeMap;

use crate::{error::GenerateError, naming::tokenize};

/// Parses a `key=value,key=value` generator parameter. Empty items are
/// skipped and a key without `=` maps to an empty value. Keys outside
/// `allowed` are rejected.
pub fn parse(parameter: &str, allowed: &[&str]) -> Result<BTreeMap<String, String>, GenerateError> {
    let mut options = BTreeMap::new();

    for item in tokenize(parameter, ",") {
        if item.trim().is_empty() {
            continue;
        }

        let parts = tokenize(&item, "=");
        let key = parts[0].trim();
        let value = parts[1..].join("=");

        if !allowed.contains(&key) {
            return Err(GenerateError::UnknownParameter(item));
        }

        log::debug!("parameter {key} = {value:?}");
        options.insert(key.to_string(), value.trim().to_string());
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::error::GenerateError;

    #[test]
    fn parses_known_keys() {
        let options = parse("services_namespace=rpc,,flag", &["services_namespace", "flag"]).unwrap();

        assert_eq!(options.get("services_namespace").map(String::as_str), Some("rpc"));
        assert_eq!(options.get("flag").map(String::as_str), Some(""));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn empty_parameter_is_empty() {
        assert!(parse("", &[]).unwrap().is_empty());
    }

    #[test]
    fn value_may_contain_equals() {
        let options = parse("runtime_module=a=b", &["runtime_module"]).unwrap();
        assert_eq!(options["runtime_module"], "a=b");
    }

    #[test]
    fn unknown_key_is_fatal() {
        let err = parse("services_namespace=x,colour=blue", &["services_namespace"]).unwrap_err();
        assert!(matches!(&err, GenerateError::UnknownParameter(item) if item == "colour=blue"));
    }
}
