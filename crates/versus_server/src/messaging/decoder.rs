//! Reassembly of tagged frames from an arbitrarily fragmented byte stream.
//!
//! TCP delivers bytes, not frames: one read may hold half a frame, several
//! frames, or both. [`FrameDecoder`] keeps whatever trailing bytes did not yet
//! form a complete frame and prepends them to the next chunk.

use super::types::{Frame, FrameTag};
use tracing::warn;

/// Stateful decoder holding the incomplete tail between reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    remainder: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back because they do not form a complete frame yet.
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Decodes every complete frame in `remainder + chunk`.
    ///
    /// Scanning stops at the first frame whose declared length runs past the
    /// end of the buffer; everything from that offset becomes the new
    /// remainder. An unknown tag byte is skipped on its own so the scan can
    /// resynchronize on the next byte. It is logged once per call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut data = std::mem::take(&mut self.remainder);
        data.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut offset = 0;
        let mut reported_unknown = false;

        while offset < data.len() {
            let Some(tag) = FrameTag::from_byte(data[offset]) else {
                if !reported_unknown {
                    reported_unknown = true;
                    warn!(
                        "⚠️ Unknown frame tag 0x{:02x} at offset {}, resynchronizing",
                        data[offset], offset
                    );
                }
                offset += 1;
                continue;
            };

            let end = offset + tag.frame_len();
            if end > data.len() {
                break;
            }

            frames.push(Frame::new(tag, &data[offset + 1..end]));
            offset = end;
        }

        data.drain(..offset);
        self.remainder = data;
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stream() -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"H003");
        stream.extend_from_slice(b"P5000000");
        stream.extend_from_slice(b"Ia");
        stream.extend_from_slice(b"Q4123412");
        stream.extend_from_slice(b"L1");
        stream.extend_from_slice(b"Ib");
        stream
    }

    #[test]
    fn test_whole_stream_decodes_in_order() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&sample_stream());

        let tags: Vec<FrameTag> = frames.iter().map(|f| f.tag).collect();
        assert_eq!(
            tags,
            vec![
                FrameTag::Handshake,
                FrameTag::PanelRequest,
                FrameTag::Input,
                FrameTag::GarbageRequest,
                FrameTag::Loss,
                FrameTag::Input,
            ]
        );
        assert_eq!(frames[0].payload, b"003");
        assert_eq!(frames[1].payload, b"5000000");
        assert_eq!(frames[2].payload, b"a");
        assert!(decoder.remainder().is_empty());
    }

    #[test]
    fn test_split_at_every_boundary_matches_whole() {
        let stream = sample_stream();
        let expected = FrameDecoder::new().feed(&stream);

        for split in 0..=stream.len() {
            let mut decoder = FrameDecoder::new();
            let mut frames = decoder.feed(&stream[..split]);
            frames.extend(decoder.feed(&stream[split..]));
            assert_eq!(frames, expected, "split at {split}");
            assert!(decoder.remainder().is_empty());
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_whole() {
        let stream = sample_stream();
        let expected = FrameDecoder::new().feed(&stream);

        let mut decoder = FrameDecoder::new();
        let frames: Vec<Frame> = stream.iter().flat_map(|b| decoder.feed(&[*b])).collect();
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_incomplete_frame_is_kept() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"IaP50");
        assert_eq!(frames, vec![Frame::new(FrameTag::Input, b"a".to_vec())]);
        assert_eq!(decoder.remainder(), b"P50");

        let frames = decoder.feed(b"00000");
        assert_eq!(
            frames,
            vec![Frame::new(FrameTag::PanelRequest, b"5000000".to_vec())]
        );
        assert!(decoder.remainder().is_empty());
    }

    #[test]
    fn test_unknown_tag_skips_one_byte() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"xyzIaZL1");
        assert_eq!(
            frames,
            vec![
                Frame::new(FrameTag::Input, b"a".to_vec()),
                Frame::new(FrameTag::Loss, b"1".to_vec()),
            ]
        );
        assert!(decoder.remainder().is_empty());
    }

    #[test]
    fn test_empty_chunk() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"").is_empty());
        assert!(decoder.feed(b"H0").is_empty());
        assert!(decoder.feed(b"").is_empty());
        assert_eq!(decoder.remainder(), b"H0");
    }
}
