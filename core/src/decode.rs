//! The single place response bodies are decoded and decoding failures are
//! classified.

use serde::de::DeserializeOwned;

use crate::error::UnmarshalError;

/// Decode `data` as JSON into `T`.
///
/// # Errors
///
/// `UnmarshalError::empty_body` for empty input, otherwise
/// `UnmarshalError::new` carrying the payload and the serde error.
pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Result<T, UnmarshalError> {
    decode_json_as(data, &short_type_name::<T>())
}

/// Like [`decode_json`], but errors name `type_name` instead of `T`. Used
/// where `T` is a transport envelope and callers only ever see its payload.
pub(crate) fn decode_json_as<T: DeserializeOwned>(
    data: &[u8],
    type_name: &str,
) -> Result<T, UnmarshalError> {
    if data.is_empty() {
        return Err(UnmarshalError::empty_body(type_name));
    }
    serde_json::from_slice(data).map_err(|err| UnmarshalError::new(data, type_name, err))
}

/// `std::any::type_name` with module paths stripped, generics kept:
/// `alloc::vec::Vec<outline_client::types::AccessKey>` becomes
/// `Vec<AccessKey>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut token = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            token.push(c);
        } else {
            out.push_str(token.rsplit("::").next().unwrap_or_default());
            token.clear();
            out.push(c);
        }
    }
    out.push_str(token.rsplit("::").next().unwrap_or_default());
    out
}
