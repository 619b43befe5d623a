//! CBOR serialization helpers.
//!
//! Wraps [`ciborium`] for the envelope and payload types. Everything that
//! crosses the transport is CBOR (RFC 8949).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Result, TransportError};

/// Encode `value` as CBOR.
///
/// # Errors
///
/// [`TransportError::Serialization`] when ciborium rejects the value.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out)
        .map_err(|e| TransportError::Serialization(format!("cbor encode: {e}")))?;
    Ok(out)
}

/// Decode a `T` from CBOR bytes.
///
/// # Errors
///
/// [`TransportError::Deserialization`] for malformed input or a schema
/// mismatch.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data)
        .map_err(|e| TransportError::Deserialization(format!("cbor decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_types::ObservationData;

    #[test]
    fn test_observation_list_survives_encoding() {
        let list = vec![ObservationData::new(10, -101), ObservationData::new(30, 887_272)];
        let bytes = to_vec(&list).expect("serialize");
        let restored: Vec<ObservationData> = from_slice(&bytes).expect("deserialize");
        assert_eq!(restored, list);
    }

    #[test]
    fn test_garbage_rejected() {
        let result: Result<Vec<ObservationData>> = from_slice(&[0xFF, 0x00, 0x13]);
        assert!(matches!(result, Err(TransportError::Deserialization(_))));
    }
}
