//! MessagePack frame codec
//!
//! A frame is a single MessagePack array whose elements are positional
//! protocol values. The codec only checks that the bytes hold exactly one
//! array; what the elements mean is up to the dispatcher.
//!
//! # Usage
//!
//! ```
//! use roomlink_protocol::codec;
//! use roomlink_protocol::opcode::JOIN_ROOM;
//! use rmpv::Value;
//!
//! let bytes = codec::encode(&[Value::from(JOIN_ROOM), Value::from("lobby")]).unwrap();
//! let values = codec::decode(&bytes).unwrap();
//!
//! assert_eq!(values[0].as_u64(), Some(JOIN_ROOM as u64));
//! assert_eq!(values[1].as_str(), Some("lobby"));
//! ```

use bytes::Bytes;
use rmpv::Value;
use serde::Serialize;

use crate::error::{FrameError, FrameResult};

/// Packs an ordered sequence of values into one binary frame
pub fn encode(values: &[Value]) -> FrameResult<Bytes> {
    let mut buf = Vec::with_capacity(16 + values.len() * 8);

    rmpv::encode::write_value(&mut buf, &Value::Array(values.to_vec()))
        .map_err(|e| FrameError::Encode(e.to_string()))?;

    Ok(Bytes::from(buf))
}

/// Unpacks a binary frame into its ordered values
pub fn decode(bytes: &[u8]) -> FrameResult<Vec<Value>> {
    let mut cursor = bytes;

    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| FrameError::Decode(e.to_string()))?;

    if !cursor.is_empty() {
        return Err(FrameError::TrailingBytes(cursor.len()));
    }

    match value {
        Value::Array(values) => Ok(values),
        other => Err(FrameError::NotAnArray(kind_of(&other).to_string())),
    }
}

/// Converts any serializable value into a protocol value
///
/// Structs become maps keyed by field name (`to_vec_named`), which is what
/// the server expects for join options and room messages.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> FrameResult<Value> {
    let buf = rmp_serde::to_vec_named(value).map_err(|e| FrameError::Encode(e.to_string()))?;

    rmpv::decode::read_value(&mut buf.as_slice()).map_err(|e| FrameError::Encode(e.to_string()))
}

/// Short name of a value's tag, for error messages and logs
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(_, _) => "ext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{JOIN_ROOM, ROOM_STATE_PATCH};
    use serde::Serialize;

    #[test]
    fn test_join_room_round_trip() {
        let bytes = encode(&[Value::from(JOIN_ROOM), Value::from("lobby")]).unwrap();
        let values = decode(&bytes).unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_u64(), Some(10));
        assert_eq!(values[1].as_str(), Some("lobby"));
    }

    #[test]
    fn test_mixed_value_types() {
        let values = vec![
            Value::from(ROOM_STATE_PATCH),
            Value::from(-7),
            Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)]),
            Value::Binary(vec![0xde, 0xad]),
        ];

        let decoded = decode(&encode(&values).unwrap()).unwrap();

        assert_eq!(decoded, values);
        assert_eq!(decoded[1].as_i64(), Some(-7));
        assert_eq!(decoded[3].as_slice(), Some(&[0xde, 0xad][..]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        // 0xc1 is the one marker MessagePack never uses
        assert!(matches!(decode(&[0xc1]), Err(FrameError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let bytes = encode(&[Value::from(JOIN_ROOM), Value::from("lobby")]).unwrap();
        let truncated = &bytes[..bytes.len() - 2];

        assert!(matches!(decode(truncated), Err(FrameError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(decode(&[]), Err(FrameError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::from("lobby")).unwrap();

        assert_eq!(decode(&buf), Err(FrameError::NotAnArray("string".into())));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(&[Value::from(1)]).unwrap().to_vec();
        bytes.push(0x00);

        assert_eq!(decode(&bytes), Err(FrameError::TrailingBytes(1)));
    }

    #[test]
    fn test_to_value_struct_becomes_map() {
        #[derive(Serialize)]
        struct Options {
            map: String,
            max_players: u8,
        }

        let value = to_value(&Options {
            map: "forest".into(),
            max_players: 4,
        })
        .unwrap();

        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].0.as_str(), Some("map"));
        assert_eq!(map[0].1.as_str(), Some("forest"));
        assert_eq!(map[1].1.as_u64(), Some(4));
    }
}
