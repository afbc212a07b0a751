// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! RIFF chunk walking over an in-memory byte slice.
//!
//! A chunk is a 4-byte id, a 4-byte little-endian length and a payload padded to an even
//! number of bytes. Nothing here ever reads past the declared end of the enclosing chunk.

use super::error::FormatError;

/// A chunk id.
pub type FourCc = [u8; 4];

/// A borrowed chunk: its id and exactly the payload bytes its header declared.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub id: FourCc,
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// For LIST/RIFF chunks, returns the form type and the nested chunk bytes.
    pub fn list(&self) -> Option<(FourCc, &'a [u8])> {
        if self.data.len() < 4 {
            return None;
        }
        let (form, rest) = self.data.split_at(4);
        Some(([form[0], form[1], form[2], form[3]], rest))
    }

    /// Printable version of the chunk id for errors and logs.
    pub fn id_str(&self) -> String {
        id_to_string(&self.id)
    }
}

pub fn id_to_string(id: &FourCc) -> String {
    String::from_utf8_lossy(id).into_owned()
}

/// Iterator over the sibling chunks contained in `data`.
///
/// Trailing bytes too short to hold a chunk header are ignored. A chunk whose declared
/// length runs past the end of `data` is reported once and ends the iteration.
pub struct Chunks<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

pub fn chunks(data: &[u8]) -> Chunks<'_> {
    Chunks {
        data,
        offset: 0,
        failed: false,
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset + 8 > self.data.len() {
            return None;
        }

        let header = &self.data[self.offset..self.offset + 8];
        let id = [header[0], header[1], header[2], header[3]];
        let declared = le_u32(header, 4) as usize;
        let body_start = self.offset + 8;
        let available = self.data.len() - body_start;

        if declared > available {
            self.failed = true;
            return Some(Err(FormatError::ChunkOverrun {
                id: id_to_string(&id),
                declared,
                available,
            }));
        }

        let data = &self.data[body_start..body_start + declared];
        // Payloads are word aligned.
        self.offset = body_start + declared + (declared & 1);

        Some(Ok(Chunk { id, data }))
    }
}

/// Finds the first chunk with the given id among the siblings in `data`.
pub fn find<'a>(data: &'a [u8], id: &FourCc) -> Result<Option<Chunk<'a>>, FormatError> {
    for chunk in chunks(data) {
        let chunk = chunk?;
        if &chunk.id == id {
            return Ok(Some(chunk));
        }
    }
    Ok(None)
}

/// Finds the first LIST chunk of the given form type and returns its nested bytes.
pub fn find_list<'a>(data: &'a [u8], form: &FourCc) -> Result<Option<&'a [u8]>, FormatError> {
    for chunk in chunks(data) {
        let chunk = chunk?;
        if &chunk.id != b"LIST" {
            continue;
        }
        if let Some((list_form, body)) = chunk.list() {
            if &list_form == form {
                return Ok(Some(body));
            }
        }
    }
    Ok(None)
}

// Little-endian field readers for fixed-size records. Callers slice records with
// `chunks_exact`, so the offsets are always in bounds.

#[inline]
pub fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub fn le_i16(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Reads a fixed-width, NUL-padded name field.
pub fn fixed_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    #[test]
    fn test_walks_padded_siblings() {
        let mut data = raw_chunk(b"abcd", &[1, 2, 3]);
        data.extend(raw_chunk(b"efgh", &[4, 5]));

        let found: Vec<Chunk> = chunks(&data).collect::<Result<_, _>>().unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(&found[0].id, b"abcd");
        assert_eq!(found[0].data, &[1, 2, 3]);
        assert_eq!(&found[1].id, b"efgh");
        assert_eq!(found[1].data, &[4, 5]);
    }

    #[test]
    fn test_overrun_is_an_error() {
        let mut data = raw_chunk(b"abcd", &[1, 2, 3, 4]);
        // Claim 100 bytes.
        data[4] = 100;

        let mut iter = chunks(&data);
        assert!(matches!(
            iter.next(),
            Some(Err(FormatError::ChunkOverrun { declared: 100, available: 4, .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_find_list() {
        let mut inner = b"pdta".to_vec();
        inner.extend(raw_chunk(b"phdr", &[0; 38]));
        let mut data = raw_chunk(b"junk", &[9]);
        data.extend(raw_chunk(b"LIST", &inner));

        let body = find_list(&data, b"pdta").unwrap().unwrap();
        let phdr = find(body, b"phdr").unwrap().unwrap();
        assert_eq!(phdr.data.len(), 38);
        assert!(find_list(&data, b"sdta").unwrap().is_none());
    }

    #[test]
    fn test_fixed_name() {
        let mut raw = [0u8; 20];
        raw[..5].copy_from_slice(b"Piano");
        assert_eq!(fixed_name(&raw), "Piano");
        assert_eq!(fixed_name(b"NoTerminator"), "NoTerminator");
    }

    #[test]
    fn test_le_readers() {
        let bytes = [0x34, 0x12, 0xff, 0xff, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(le_u16(&bytes, 0), 0x1234);
        assert_eq!(le_i16(&bytes, 2), -1);
        assert_eq!(le_u32(&bytes, 4), 0x1234_5678);
    }
}
