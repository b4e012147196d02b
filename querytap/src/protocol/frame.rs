//! Length-prefixed frame carving
//!
//! ```text
//! offset 0..2 : 24-bit little-endian length L (command byte + payload)
//! offset 3    : sequence id (ignored)
//! offset 4    : command byte
//! offset 5..  : payload, L-1 bytes
//! ```

/// Command byte of a text query
pub const COM_QUERY: u8 = 3;

/// Length field plus sequence id
const HEADER_LEN: usize = 4;

/// Smallest buffer that can hold a frame with a command byte
const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// One protocol message carved out of a flow's buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.command == COM_QUERY
    }
}

/// Try to carve one complete frame from the front of `buffer`.
///
/// On success the `L+4` frame bytes are removed and any remainder is left
/// in place for a later call. Returns `None` (buffer untouched) when fewer
/// than 5 bytes are buffered, when `L == 0`, or when fewer than `L+4`
/// bytes are available. An absurd length just keeps returning `None`.
pub fn carve(buffer: &mut Vec<u8>) -> Option<Frame> {
    if buffer.len() < MIN_FRAME_LEN {
        return None;
    }

    let len = usize::from(buffer[0]) | usize::from(buffer[1]) << 8 | usize::from(buffer[2]) << 16;
    let end = len + HEADER_LEN;
    if len == 0 || buffer.len() < end {
        return None;
    }

    let command = buffer[HEADER_LEN];
    let payload = buffer[MIN_FRAME_LEN..end].to_vec();
    buffer.drain(..end);

    Some(Frame { command, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_buffer_is_incomplete() {
        let mut buf = vec![3, 0, 0, 0];
        assert_eq!(carve(&mut buf), None);
        assert_eq!(buf, vec![3, 0, 0, 0]);
    }

    #[test]
    fn test_declared_length_exceeds_buffer() {
        let mut buf = vec![10, 0, 0, 0, 3, b'S', b'E'];
        let before = buf.clone();
        assert_eq!(carve(&mut buf), None);
        assert_eq!(buf, before);
    }

    #[test]
    fn test_zero_length_is_incomplete() {
        let mut buf = vec![0, 0, 0, 0, 3, b'x'];
        assert_eq!(carve(&mut buf), None);
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_carve_leaves_remainder() {
        let mut buf = vec![3, 0, 0, 0, 3, 0x53, 0x45, 0x4C, 0x45, 0x43, 0x54];
        let frame = carve(&mut buf).expect("frame");

        assert_eq!(frame.command, COM_QUERY);
        assert_eq!(frame.payload, b"SE".to_vec());
        assert!(frame.is_query());
        // L+4 = 7 bytes consumed
        assert_eq!(buf, b"LECT".to_vec());
    }

    #[test]
    fn test_carve_exact_frame_empties_buffer() {
        let mut buf = vec![9, 0, 0, 1, 3];
        buf.extend_from_slice(b"SELECT 1");
        let frame = carve(&mut buf).expect("frame");

        assert_eq!(frame.payload, b"SELECT 1".to_vec());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_command_only_frame() {
        // COM_PING: length 1, no payload
        let mut buf = vec![1, 0, 0, 0, 14];
        let frame = carve(&mut buf).expect("frame");
        assert_eq!(frame.command, 14);
        assert!(frame.payload.is_empty());
        assert!(!frame.is_query());
    }

    #[test]
    fn test_huge_length_never_panics() {
        let mut buf = vec![0xff, 0xff, 0xff, 0, 3, 1, 2, 3];
        assert_eq!(carve(&mut buf), None);
        assert_eq!(carve(&mut buf), None);
    }

    #[test]
    fn test_two_frames_carve_in_order() {
        let mut buf = vec![2, 0, 0, 0, 3, b'a', 2, 0, 0, 0, 3, b'b'];
        assert_eq!(carve(&mut buf).unwrap().payload, b"a".to_vec());
        assert_eq!(carve(&mut buf).unwrap().payload, b"b".to_vec());
        assert!(buf.is_empty());
    }
}
