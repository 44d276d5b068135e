//! NOP OUT and NOP IN: keep-alive frames with no fields of their own.

use super::buffer::FrameBuffer;
use super::PiuKind;

/// Sent by the host to check the device is alive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NopOutPiu {
    buffer: FrameBuffer,
}

/// The device's answer to a [`NopOutPiu`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NopInPiu {
    buffer: FrameBuffer,
}

impl NopOutPiu {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NopInPiu {
    pub fn new() -> Self {
        Self::default()
    }
}

buffer_frame!(NopOutPiu, PiuKind::NopOut, &[]);
buffer_frame!(NopInPiu, PiuKind::NopIn, &[]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piu::PiuFrame;

    #[test]
    fn zeroed_by_default() {
        assert_eq!(NopOutPiu::new().to_bytes(), [0u8; 32]);
        assert_eq!(NopInPiu::new().to_bytes(), [0u8; 32]);
    }

    #[test]
    fn opaque_bytes_survive() {
        let bytes = [0xa5u8; 32];
        assert_eq!(NopInPiu::from_bytes(&bytes).unwrap().to_bytes(), bytes);
        assert!(NopOutPiu::from_bytes(&bytes[..31]).is_err());
    }
}
