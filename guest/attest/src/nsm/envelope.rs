//! Keyed envelope codec.
//!
//! Every NSM message is a single-entry CBOR map `{operation: payload}`.
//! Operations without arguments travel as the bare operation-name text
//! string, which is how the device encodes unit requests and responses.
//! A response whose key differs from the request's operation is a protocol
//! violation, not a decode failure.

use a3s_attest_core::error::{AttestError, Result};
use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::OP_ERROR;

/// Encode `payload` under `operation`.
pub fn encode<T: Serialize>(operation: &str, payload: &T) -> Result<Vec<u8>> {
    let value = Value::serialized(payload).map_err(|e| {
        AttestError::Protocol(format!("failed to encode {} payload: {}", operation, e))
    })?;

    let envelope = if value.is_null() {
        Value::Text(operation.to_string())
    } else {
        Value::Map(vec![(Value::Text(operation.to_string()), value)])
    };

    let mut buf = Vec::new();
    ciborium::into_writer(&envelope, &mut buf).map_err(|e| {
        AttestError::Protocol(format!("failed to encode {} envelope: {}", operation, e))
    })?;
    Ok(buf)
}

/// Decode a response that must be keyed by `operation`.
pub fn decode<T: DeserializeOwned>(operation: &str, bytes: &[u8]) -> Result<T> {
    let value: Value = ciborium::from_reader(bytes).map_err(|e| {
        AttestError::Protocol(format!("undecodable {} response: {}", operation, e))
    })?;

    let (key, payload) = split_envelope(operation, value)?;

    if key == OP_ERROR && operation != OP_ERROR {
        let code = match &payload {
            Value::Text(code) => code.clone(),
            other => format!("{:?}", other),
        };
        return Err(AttestError::DeviceIo {
            operation: operation.to_string(),
            message: format!("device returned error {}", code),
        });
    }

    if key != operation {
        return Err(AttestError::Protocol(format!(
            "response key '{}' does not match request '{}'",
            key, operation
        )));
    }

    payload.deserialized().map_err(|e| {
        AttestError::Protocol(format!("malformed {} payload: {}", operation, e))
    })
}

fn split_envelope(operation: &str, value: Value) -> Result<(String, Value)> {
    match value {
        Value::Text(key) => Ok((key, Value::Null)),
        Value::Map(mut entries) => {
            if entries.len() != 1 {
                return Err(AttestError::Protocol(format!(
                    "{} response envelope has {} entries, expected 1",
                    operation,
                    entries.len()
                )));
            }
            match entries.remove(0) {
                (Value::Text(key), payload) => Ok((key, payload)),
                _ => Err(AttestError::Protocol(format!(
                    "{} response envelope key is not a string",
                    operation
                ))),
            }
        }
        _ => Err(AttestError::Protocol(format!(
            "{} response is not a keyed envelope",
            operation
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a3s_attest_core::error::ErrorKind;
    use serde::Deserialize;
    use serde_bytes::ByteBuf;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        index: u16,
        data: ByteBuf,
    }

    fn cbor(value: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_keyed_payload() {
        let bytes = encode(
            "ExtendPCR",
            &Payload {
                index: 16,
                data: ByteBuf::from(vec![1, 2]),
            },
        )
        .unwrap();
        let value: Value = ciborium::from_reader(&bytes[..]).unwrap();
        let entries = value.as_map().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Value::Text("ExtendPCR".into()));
        let fields = entries[0].1.as_map().unwrap();
        assert!(fields
            .iter()
            .any(|(k, v)| k == &Value::Text("data".into()) && v == &Value::Bytes(vec![1, 2])));
    }

    #[test]
    fn test_encode_unit_payload_is_bare_text() {
        let bytes = encode("GetRandom", &()).unwrap();
        let value: Value = ciborium::from_reader(&bytes[..]).unwrap();
        assert_eq!(value, Value::Text("GetRandom".into()));
    }

    #[test]
    fn test_decode_matching_key() {
        let bytes = encode(
            "DescribePCR",
            &Payload {
                index: 3,
                data: ByteBuf::from(vec![9]),
            },
        )
        .unwrap();
        let decoded: Payload = decode("DescribePCR", &bytes).unwrap();
        assert_eq!(decoded.index, 3);
        assert_eq!(decoded.data.as_ref(), &[9]);
    }

    #[test]
    fn test_decode_unit_response() {
        let bytes = cbor(&Value::Text("LockPCR".into()));
        let () = decode("LockPCR", &bytes).unwrap();
    }

    #[test]
    fn test_decode_mismatched_key_is_protocol_error() {
        let bytes = cbor(&Value::Map(vec![(
            Value::Text("ExtendPCR".into()),
            Value::Map(vec![]),
        )]));
        let err = decode::<Payload>("DescribePCR", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_decode_error_response_is_device_error() {
        let bytes = cbor(&Value::Map(vec![(
            Value::Text("Error".into()),
            Value::Text("InvalidIndex".into()),
        )]));
        let err = decode::<Payload>("DescribePCR", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceIo);
        assert!(err.to_string().contains("InvalidIndex"));
    }

    #[test]
    fn test_decode_multi_entry_map_rejected() {
        let bytes = cbor(&Value::Map(vec![
            (Value::Text("A".into()), Value::Null),
            (Value::Text("B".into()), Value::Null),
        ]));
        let err = decode::<()>("A", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_garbage_is_protocol_error() {
        let err = decode::<()>("GetRandom", &[0xFF, 0x00, 0x13]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_wrong_payload_shape() {
        let bytes = cbor(&Value::Map(vec![(
            Value::Text("DescribePCR".into()),
            Value::Text("not a record".into()),
        )]));
        let err = decode::<Payload>("DescribePCR", &bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("malformed"));
    }
}
