// Key/value list to attribute map conversion
//
// Keys under the reserved `lightstep.` namespace are dropped, except for the
// component name which carries the service identity. Values that are not
// valid UTF-8 are dropped and reported, without stopping the rest of the list.

use crate::error::NonUtf8AttributeError;
use crate::model::{AttributeValue, Attributes};

pub const RESERVED_PREFIX: &str = "lightstep.";
pub const COMPONENT_NAME_KEY: &str = "lightstep.component_name";

/// A wire value before conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// String bytes not yet checked for UTF-8.
    Bytes(&'a [u8]),
    /// String already known to be text.
    Text(&'a str),
    Bool(bool),
    Int(i64),
    Double(f64),
    /// JSON document kept as its raw encoding.
    Json(&'a str),
}

/// Whether `key` is dropped by the namespace filter.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX) && key != COMPONENT_NAME_KEY
}

/// Insert every acceptable pair into `destination`.
///
/// On error the destination still holds every valid entry; the error lists
/// the keys whose string values were rejected.
pub fn map_attributes<'a, I>(
    pairs: I,
    destination: &mut Attributes,
) -> Result<(), NonUtf8AttributeError>
where
    I: IntoIterator<Item = (&'a str, RawValue<'a>)>,
{
    let mut invalid_keys = Vec::new();

    for (key, value) in pairs {
        if is_reserved_key(key) {
            continue;
        }

        let value = match value {
            RawValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => AttributeValue::String(text.to_string()),
                Err(_) => {
                    invalid_keys.push(key.to_string());
                    continue;
                }
            },
            RawValue::Text(text) | RawValue::Json(text) => AttributeValue::String(text.to_string()),
            RawValue::Bool(b) => AttributeValue::Bool(b),
            RawValue::Int(i) => AttributeValue::Int(i),
            RawValue::Double(d) => AttributeValue::Double(d),
        };
        destination.insert(key, value);
    }

    if invalid_keys.is_empty() {
        Ok(())
    } else {
        Err(NonUtf8AttributeError { keys: invalid_keys })
    }
}

/// Copy text pairs through the namespace filter. No UTF-8 check applies, so
/// this never fails.
pub fn copy_text_attributes<'a, I>(pairs: I, destination: &mut Attributes)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (key, value) in pairs {
        if is_reserved_key(key) {
            continue;
        }
        destination.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_namespace_is_filtered() {
        let mut attrs = Attributes::new();
        map_attributes(
            [
                ("lightstep.guid", RawValue::Text("abc")),
                (COMPONENT_NAME_KEY, RawValue::Text("checkout")),
                ("lightstep.hostname", RawValue::Bytes(b"host-1")),
                ("http.method", RawValue::Bytes(b"GET")),
            ],
            &mut attrs,
        )
        .unwrap();

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_str(COMPONENT_NAME_KEY), Some("checkout"));
        assert_eq!(attrs.get_str("http.method"), Some("GET"));
    }

    #[test]
    fn test_invalid_utf8_keeps_valid_entries() {
        let mut attrs = Attributes::new();
        let err = map_attributes(
            [
                ("bad", RawValue::Bytes(b"pok\xE9mon")),
                ("good", RawValue::Bytes(b"pikachu")),
                ("also_bad", RawValue::Bytes(&[0xff, 0xfe])),
                ("count", RawValue::Int(3)),
            ],
            &mut attrs,
        )
        .unwrap_err();

        assert_eq!(err.keys, vec!["bad".to_string(), "also_bad".to_string()]);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_str("good"), Some("pikachu"));
        assert!(!attrs.contains_key("bad"));
    }

    #[test]
    fn test_value_kinds() {
        let mut attrs = Attributes::new();
        map_attributes(
            [
                ("b", RawValue::Bool(true)),
                ("i", RawValue::Int(-4)),
                ("d", RawValue::Double(0.5)),
                ("j", RawValue::Json(r#"{"a":1}"#)),
            ],
            &mut attrs,
        )
        .unwrap();

        assert_eq!(attrs.get("b"), Some(&AttributeValue::Bool(true)));
        assert_eq!(attrs.get("i"), Some(&AttributeValue::Int(-4)));
        assert_eq!(attrs.get("d"), Some(&AttributeValue::Double(0.5)));
        assert_eq!(attrs.get_str("j"), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_copy_text_attributes() {
        let mut attrs = Attributes::new();
        copy_text_attributes(
            [("lightstep.tracer_version", "0.9"), ("region", "eu-1")],
            &mut attrs,
        );
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get_str("region"), Some("eu-1"));
    }
}
