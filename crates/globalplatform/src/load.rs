//! Load file block streaming
//!
//! The caller supplies the load file as the concatenated CAP components
//! (parsing the CAP container happens elsewhere). The stream wraps it in a
//! `C4` load file data block and cuts it into LOAD commands that still fit a
//! short APDU once the 8-byte C-MAC is appended.

use bytes::{BufMut, Bytes, BytesMut};

use crate::commands::LoadCommand;
use crate::constants::tags;

/// Maximum data per LOAD block (255 minus the C-MAC)
pub const BLOCK_SIZE: usize = 247;

/// Iterator over the LOAD commands of one load file
#[derive(Debug, Clone)]
pub struct LoadFileStream {
    data: Bytes,
    next: usize,
    total: usize,
}

impl LoadFileStream {
    /// Wrap `load_file` into a `C4` data block ready to be streamed
    pub fn new(load_file: &[u8]) -> Self {
        let mut data = BytesMut::with_capacity(load_file.len() + 5);
        data.put_u8(tags::LOAD_FILE_DATA_BLOCK);
        put_ber_length(&mut data, load_file.len());
        data.put_slice(load_file);

        let total = data.len().div_ceil(BLOCK_SIZE);
        Self {
            data: data.freeze(),
            next: 0,
            total,
        }
    }

    /// Number of LOAD commands the file needs
    pub const fn block_count(&self) -> usize {
        self.total
    }
}

impl Iterator for LoadFileStream {
    type Item = LoadCommand;

    fn next(&mut self) -> Option<LoadCommand> {
        if self.next >= self.total {
            return None;
        }

        let index = self.next;
        let start = index * BLOCK_SIZE;
        let end = (start + BLOCK_SIZE).min(self.data.len());
        self.next += 1;

        // block numbers wrap after 255
        Some(LoadCommand::new(
            self.next == self.total,
            index as u8,
            self.data.slice(start..end),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LoadFileStream {}

fn put_ber_length(buf: &mut BytesMut, len: usize) {
    match len {
        0..0x80 => buf.put_u8(len as u8),
        0x80..0x100 => {
            buf.put_u8(0x81);
            buf.put_u8(len as u8);
        }
        0x100..0x10000 => {
            buf.put_u8(0x82);
            buf.put_u16(len as u16);
        }
        _ => {
            buf.put_u8(0x83);
            buf.put_uint(len as u64, 3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexum_keycard_apdu::ApduCommand;

    #[test]
    fn test_ber_length() {
        let mut buf = BytesMut::new();
        put_ber_length(&mut buf, 0x7F);
        put_ber_length(&mut buf, 0x80);
        put_ber_length(&mut buf, 0x1234);
        assert_eq!(buf.as_ref(), &[0x7F, 0x81, 0x80, 0x82, 0x12, 0x34]);
    }

    #[test]
    fn test_single_block() {
        let mut stream = LoadFileStream::new(&[0xAA; 10]);
        assert_eq!(stream.block_count(), 1);

        let block = stream.next().unwrap();
        assert!(block.is_last());
        let command = block.command();
        assert_eq!((command.p1, command.p2), (0x80, 0x00));
        assert_eq!(&command.data()[..2], &[0xC4, 0x0A]);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_blocks_cover_the_file() {
        let load_file: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let stream = LoadFileStream::new(&load_file);
        // C4 82 03 E8 header adds 4 bytes
        assert_eq!(stream.block_count(), 1004usize.div_ceil(BLOCK_SIZE));
        assert_eq!(stream.len(), 5);

        let commands: Vec<_> = stream.map(|c| c.command()).collect();
        let indexes: Vec<u8> = commands.iter().map(|c| c.p2).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);

        let last_flags: Vec<u8> = commands.iter().map(|c| c.p1).collect();
        assert_eq!(last_flags, vec![0x00, 0x00, 0x00, 0x00, 0x80]);

        let joined: Vec<u8> = commands.iter().flat_map(|c| c.data().to_vec()).collect();
        assert_eq!(&joined[..4], &[0xC4, 0x82, 0x03, 0xE8]);
        assert_eq!(&joined[4..], load_file.as_slice());
        assert!(commands.iter().all(|c| c.data().len() <= BLOCK_SIZE));
    }
}
