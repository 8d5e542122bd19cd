//! Decoded inbound frames
//!
//! A [`Frame`] is the decoded value sequence with its leading opcode split
//! off. Accessors read positional arguments by index and report a
//! [`FrameError`] when an argument is missing or has the wrong tag.

use bytes::Bytes;
use rmpv::Value;

use crate::codec::{self, kind_of};
use crate::error::{FrameError, FrameResult};
use crate::opcode::Opcode;

/// Server-assigned numeric room identifier
pub type RoomId = u64;

/// Key a room is registered under
///
/// A room is keyed by the name it was requested with until the server
/// confirms the join, after which it is keyed by its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Id(RoomId),
    Name(String),
}

impl RoomKey {
    /// Interprets the room slot of a frame by its tag
    ///
    /// Integers are room ids, strings are room names. The same slot carries
    /// a name before a join completes and an id afterwards.
    pub fn from_value(value: &Value) -> FrameResult<Self> {
        match value {
            Value::Integer(n) => n.as_u64().map(RoomKey::Id).ok_or_else(|| {
                FrameError::Decode(format!("room id {} is not a valid id", n))
            }),
            Value::String(s) => s
                .as_str()
                .map(|name| RoomKey::Name(name.to_string()))
                .ok_or_else(|| FrameError::Decode("room name is not valid UTF-8".into())),
            other => Err(FrameError::Decode(format!(
                "room key must be an integer or string, got {}",
                kind_of(other)
            ))),
        }
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomKey::Id(id) => write!(f, "#{}", id),
            RoomKey::Name(name) => write!(f, "{:?}", name),
        }
    }
}

impl From<RoomId> for RoomKey {
    fn from(id: RoomId) -> Self {
        RoomKey::Id(id)
    }
}

impl From<&str> for RoomKey {
    fn from(name: &str) -> Self {
        RoomKey::Name(name.to_string())
    }
}

/// One decoded inbound frame: an opcode plus positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    code: u64,
    args: Vec<Value>,
}

impl Frame {
    /// Builds a frame from decoded values, validating only the opcode slot
    pub fn from_values(mut values: Vec<Value>) -> FrameResult<Self> {
        if values.is_empty() {
            return Err(FrameError::Empty);
        }

        let head = values.remove(0);
        let code = head
            .as_u64()
            .ok_or_else(|| FrameError::InvalidOpcode(head.to_string()))?;

        Ok(Self { code, args: values })
    }

    /// Decodes raw bytes straight into a frame
    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        Self::from_values(codec::decode(bytes)?)
    }

    /// Raw opcode value
    pub fn code(&self) -> u64 {
        self.code
    }

    /// Known opcode, `None` if this client does not recognize it
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_code(self.code)
    }

    /// Arguments following the opcode
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument at `index` (0 is the first value after the opcode)
    pub fn arg(&self, index: usize) -> FrameResult<&Value> {
        self.args.get(index).ok_or_else(|| {
            FrameError::Decode(format!(
                "opcode {} expects an argument at position {}",
                self.code, index
            ))
        })
    }

    /// Takes ownership of the argument at `index`, leaving nil in its place
    pub fn take_arg(&mut self, index: usize) -> FrameResult<Value> {
        let code = self.code;
        self.args
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, Value::Nil))
            .ok_or_else(|| {
                FrameError::Decode(format!(
                    "opcode {} expects an argument at position {}",
                    code, index
                ))
            })
    }

    /// Room slot at `index`, interpreted by its tag
    pub fn room_key(&self, index: usize) -> FrameResult<RoomKey> {
        RoomKey::from_value(self.arg(index)?)
    }

    /// Room slot at `index`, which must hold a numeric id
    pub fn room_id(&self, index: usize) -> FrameResult<RoomId> {
        match self.room_key(index)? {
            RoomKey::Id(id) => Ok(id),
            RoomKey::Name(name) => Err(FrameError::Decode(format!(
                "expected a room id at position {}, got name {:?}",
                index, name
            ))),
        }
    }

    /// String argument at `index`
    pub fn string(&self, index: usize) -> FrameResult<String> {
        let value = self.arg(index)?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            FrameError::Decode(format!(
                "expected a string at position {}, got {}",
                index,
                kind_of(value)
            ))
        })
    }

    /// Numeric argument at `index`, integers are widened to `f64`
    pub fn number(&self, index: usize) -> FrameResult<f64> {
        let value = self.arg(index)?;
        value.as_f64().ok_or_else(|| {
            FrameError::Decode(format!(
                "expected a number at position {}, got {}",
                index,
                kind_of(value)
            ))
        })
    }

    /// Byte-sequence argument at `index`
    ///
    /// Accepts a binary value as-is, or an array of integers in `0..=255`
    /// which is reassembled into one contiguous buffer in element order.
    pub fn bytes(&self, index: usize) -> FrameResult<Bytes> {
        match self.arg(index)? {
            Value::Binary(data) => Ok(Bytes::copy_from_slice(data)),
            Value::Array(items) => {
                let mut buf = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let byte = item
                        .as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| {
                            FrameError::Decode(format!(
                                "byte sequence element {} is not a byte: {}",
                                i, item
                            ))
                        })?;
                    buf.push(byte);
                }
                Ok(Bytes::from(buf))
            }
            other => Err(FrameError::Decode(format!(
                "expected a byte sequence at position {}, got {}",
                index,
                kind_of(other)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{JOIN_ROOM, ROOM_STATE_PATCH, USER_ID};

    fn frame(values: Vec<Value>) -> Frame {
        Frame::from_values(values).unwrap()
    }

    #[test]
    fn test_opcode_split() {
        let f = frame(vec![Value::from(USER_ID), Value::from("abc")]);
        assert_eq!(f.code(), 1);
        assert_eq!(f.opcode(), Some(Opcode::UserId));
        assert_eq!(f.args().len(), 1);
        assert_eq!(f.string(0).unwrap(), "abc");
    }

    #[test]
    fn test_unknown_opcode_is_not_an_error() {
        let f = frame(vec![Value::from(99)]);
        assert_eq!(f.code(), 99);
        assert_eq!(f.opcode(), None);
    }

    #[test]
    fn test_empty_frame() {
        assert_eq!(Frame::from_values(vec![]), Err(FrameError::Empty));
    }

    #[test]
    fn test_non_integer_opcode() {
        let result = Frame::from_values(vec![Value::from("join")]);
        assert!(matches!(result, Err(FrameError::InvalidOpcode(_))));

        let result = Frame::from_values(vec![Value::from(-1)]);
        assert!(matches!(result, Err(FrameError::InvalidOpcode(_))));
    }

    #[test]
    fn test_room_key_by_tag() {
        let f = frame(vec![Value::from(JOIN_ROOM), Value::from(42), Value::from("lobby")]);
        assert_eq!(f.room_key(0).unwrap(), RoomKey::Id(42));
        assert_eq!(f.room_key(1).unwrap(), RoomKey::Name("lobby".into()));
        assert_eq!(f.room_id(0).unwrap(), 42);
        assert!(f.room_id(1).is_err());
    }

    #[test]
    fn test_room_key_zero_is_a_real_id() {
        let f = frame(vec![Value::from(JOIN_ROOM), Value::from(0)]);
        assert_eq!(f.room_key(0).unwrap(), RoomKey::Id(0));
    }

    #[test]
    fn test_room_key_rejects_other_tags() {
        let f = frame(vec![Value::from(JOIN_ROOM), Value::Nil, Value::from(-3)]);
        assert!(f.room_key(0).is_err());
        assert!(f.room_key(1).is_err());
        assert!(f.room_key(2).is_err());
    }

    #[test]
    fn test_patch_bytes_from_array() {
        let f = frame(vec![
            Value::from(ROOM_STATE_PATCH),
            Value::from(7),
            Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)]),
        ]);

        assert_eq!(f.bytes(1).unwrap(), Bytes::from_static(&[0x01, 0x02, 0x03]));
    }

    #[test]
    fn test_patch_bytes_from_binary() {
        let f = frame(vec![
            Value::from(ROOM_STATE_PATCH),
            Value::from(7),
            Value::Binary(vec![9, 8, 7]),
        ]);

        assert_eq!(f.bytes(1).unwrap(), Bytes::from_static(&[9, 8, 7]));
    }

    #[test]
    fn test_patch_bytes_rejects_out_of_range() {
        let f = frame(vec![
            Value::from(ROOM_STATE_PATCH),
            Value::from(7),
            Value::Array(vec![Value::from(1), Value::from(256)]),
        ]);

        assert!(f.bytes(1).is_err());
    }

    #[test]
    fn test_number_widens_integers() {
        let f = frame(vec![Value::from(14), Value::from(1500), Value::from(2.5)]);
        assert_eq!(f.number(0).unwrap(), 1500.0);
        assert_eq!(f.number(1).unwrap(), 2.5);
        assert!(f.number(2).is_err());
    }

    #[test]
    fn test_take_arg() {
        let mut f = frame(vec![Value::from(13), Value::from(1), Value::from("payload")]);
        assert_eq!(f.take_arg(1).unwrap(), Value::from("payload"));
        assert_eq!(f.arg(1).unwrap(), &Value::Nil);
        assert!(f.take_arg(5).is_err());
    }

    #[test]
    fn test_decode_bytes() {
        let bytes = codec::encode(&[Value::from(USER_ID), Value::from("client-1")]).unwrap();
        let f = Frame::decode(&bytes).unwrap();
        assert_eq!(f.opcode(), Some(Opcode::UserId));
        assert_eq!(f.string(0).unwrap(), "client-1");
    }

    #[test]
    fn test_room_key_display() {
        assert_eq!(RoomKey::Id(5).to_string(), "#5");
        assert_eq!(RoomKey::from("lobby").to_string(), "\"lobby\"");
    }
}
