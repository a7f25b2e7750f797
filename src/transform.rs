use serde::{Deserialize, Serialize};

/// XOR key shared by cooperating proxy instances. Self-inverse, so the
/// same operation encodes and decodes.
pub const XOR_KEY: u8 = 1;

/// Which leg of a connection's traffic has the obfuscation applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformMode {
    /// Data flows through untouched.
    #[default]
    None,
    /// Decode data as it is read from clients (remote-side instance).
    DecodeOnClientRead,
    /// Encode data as it is forwarded to the next hop (local-side instance).
    EncodeOnServerWrite,
}

impl TransformMode {
    pub fn is_active(self) -> bool {
        !matches!(self, TransformMode::None)
    }
}

/// Constructed once per process from the configuration and threaded into
/// the header reader and relay engine; there is no ambient transform state.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    mode: TransformMode,
}

impl Transform {
    pub fn new(mode: TransformMode) -> Self {
        Self { mode }
    }

    pub fn is_active(&self) -> bool {
        self.mode.is_active()
    }

    /// XORs every byte in place when a direction is configured. Applying
    /// twice restores the original bytes.
    pub fn apply(&self, buf: &mut [u8]) {
        if self.mode.is_active() {
            for byte in buf.iter_mut() {
                *byte ^= XOR_KEY;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_transform_round_trips() {
        let transform = Transform::new(TransformMode::EncodeOnServerWrite);
        let original = b"GET / HTTP/1.1\r\n\r\n".to_vec();
        let mut buf = original.clone();

        transform.apply(&mut buf);
        assert_ne!(buf, original);

        transform.apply(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn active_transform_xors_each_byte_with_key() {
        let transform = Transform::new(TransformMode::DecodeOnClientRead);
        let mut buf = vec![0x00, 0x01, 0xfe, 0xff];

        transform.apply(&mut buf);
        assert_eq!(buf, vec![0x01, 0x00, 0xff, 0xfe]);
    }

    #[test]
    fn inactive_transform_leaves_bytes_unchanged() {
        let transform = Transform::new(TransformMode::None);
        let original = b"hello".to_vec();
        let mut buf = original.clone();

        transform.apply(&mut buf);
        assert_eq!(buf, original);
        assert!(!transform.is_active());
    }
}
