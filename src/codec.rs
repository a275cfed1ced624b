//! Wire bytes ⇄ in-memory values.
//!
//! JSON goes through `serde_json`, XML through `quick-xml`'s serde support.
//! XML documents take their root element from the serialized type's name
//! (or its `#[serde(rename)]`). Values without one (strings, numbers, `()`,
//! sequences) are written under [`XML_ROOT`]: `<response>7</response>`. A
//! sequence repeats the root once per element, which [`decode`] reads back as
//! a sequence. `None` encodes as an empty document.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::media::MediaType;

/// Root element for XML values that carry no type name.
pub const XML_ROOT: &str = "response";

/// Serializes `value` in the given format.
pub fn encode<T>(media: MediaType, value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    match media {
        MediaType::Json => serde_json::to_vec(value).map_err(|e| CodecError::Json(e.to_string())),
        MediaType::Xml => match quick_xml::se::to_string(value) {
            Ok(text) => Ok(text.into_bytes()),
            Err(_) => quick_xml::se::to_string_with_root(XML_ROOT, value)
                .map(String::into_bytes)
                .map_err(|e| CodecError::Xml(e.to_string())),
        },
    }
}

/// Deserializes a `T` from `bytes` in the given format.
///
/// Fails on malformed syntax and on any field the target type requires but
/// the document does not carry.
pub fn decode<T>(media: MediaType, bytes: &[u8]) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    match media {
        MediaType::Json => serde_json::from_slice(bytes).map_err(|e| CodecError::Json(e.to_string())),
        MediaType::Xml => {
            let text = std::str::from_utf8(bytes).map_err(|e| CodecError::Xml(e.to_string()))?;
            quick_xml::de::from_str(text).map_err(|e| CodecError::Xml(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    #[serde(rename = "user")]
    struct User {
        id: u64,
        name: String,
        admin: bool,
        nickname: Option<String>,
    }

    fn alice() -> User {
        User { id: 7, name: "alice".into(), admin: false, nickname: Some("al".into()) }
    }

    #[rstest]
    #[case::json(MediaType::Json)]
    #[case::xml(MediaType::Xml)]
    fn round_trip(#[case] media: MediaType) {
        let bytes = encode(media, &alice()).unwrap();
        let back: User = decode(media, &bytes).unwrap();
        assert_eq!(back, alice());
    }

    #[rstest]
    #[case::json(MediaType::Json)]
    #[case::xml(MediaType::Xml)]
    fn values_without_a_type_name_round_trip(#[case] media: MediaType) {
        let tags = vec!["home".to_owned(), "a & b".to_owned()];
        assert_eq!(decode::<Vec<String>>(media, &encode(media, &tags).unwrap()).unwrap(), tags);

        let empty: Vec<String> = Vec::new();
        assert_eq!(decode::<Vec<String>>(media, &encode(media, &empty).unwrap()).unwrap(), empty);

        let name = "alice".to_owned();
        assert_eq!(decode::<String>(media, &encode(media, &name).unwrap()).unwrap(), name);

        assert_eq!(decode::<u64>(media, &encode(media, &42u64).unwrap()).unwrap(), 42);
        assert_eq!(decode::<Option<u64>>(media, &encode(media, &Some(5u64)).unwrap()).unwrap(), Some(5));
        assert_eq!(decode::<Option<u64>>(media, &encode(media, &None::<u64>).unwrap()).unwrap(), None);

        let users = vec![alice(), alice()];
        assert_eq!(decode::<Vec<User>>(media, &encode(media, &users).unwrap()).unwrap(), users);
    }

    #[test]
    fn xml_falls_back_to_fixed_root() {
        let xml = |bytes: Vec<u8>| String::from_utf8(bytes).unwrap();
        assert_eq!(xml(encode(MediaType::Xml, "alice").unwrap()), "<response>alice</response>");
        assert_eq!(xml(encode(MediaType::Xml, &42u64).unwrap()), "<response>42</response>");
        assert_eq!(xml(encode(MediaType::Xml, &()).unwrap()), "<response/>");
        assert_eq!(
            xml(encode(MediaType::Xml, &vec![1, 2]).unwrap()),
            "<response>1</response><response>2</response>"
        );
    }

    #[test]
    fn xml_root_follows_serde_name() {
        let bytes = encode(MediaType::Xml, &alice()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<user>"), "{text}");
        assert!(text.contains("<name>alice</name>"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = decode::<User>(MediaType::Json, b"{\"id\": 7,").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = decode::<User>(MediaType::Json, br#"{"id":7,"admin":true}"#).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let err = decode::<User>(MediaType::Xml, b"<user><id>7</user>").unwrap_err();
        assert!(matches!(err, CodecError::Xml(_)));
    }

    #[test]
    fn optional_field_may_be_absent() {
        let user: User = decode(MediaType::Json, br#"{"id":1,"name":"bob","admin":true}"#).unwrap();
        assert_eq!(user.nickname, None);
    }
}
