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

use std::path::PathBuf;

/// Errors raised while reading a bank container. Any of these rejects the whole bank.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not a sound bank: expected RIFF/sfbk signature")]
    BadSignature,

    #[error("missing required chunk '{0}'")]
    MissingChunk(&'static str),

    #[error("chunk '{id}' declares {declared} bytes but only {available} remain")]
    ChunkOverrun {
        id: String,
        declared: usize,
        available: usize,
    },

    #[error("table '{table}' is {len} bytes, not a multiple of its {record_size}-byte record")]
    BadTableSize {
        table: &'static str,
        len: usize,
        record_size: usize,
    },

    #[error("table '{0}' has no terminator record")]
    MissingTerminator(&'static str),

    #[error("unable to read bank file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
