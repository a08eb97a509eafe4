// Delta command opcodes.
//
// Every command is one opcode byte followed by zero, one or two big-endian
// parameters whose widths the opcode fixes:
//
//   0x00          END
//   0x01..=0x40   LITERAL, length is the opcode itself
//   0x41..=0x44   LITERAL, length follows in 1/2/4/8 bytes
//   0x45..=0x54   COPY, offset then length, each 1/2/4/8 bytes
//   0x55..=0xFF   reserved
//
// The table is generated once; decoders index it by opcode.

use super::header::{DELTA_HEADER_LEN, check_delta_header};
use super::netint::{self, WIDTHS};
use crate::error::{Error, Result};

pub const OP_END: u8 = 0x00;

/// Shortest immediate-length literal.
pub const OP_LITERAL_1: u8 = 0x01;

/// Longest immediate-length literal.
pub const OP_LITERAL_64: u8 = 0x40;

/// Literal whose length follows in one byte; N2/N4/N8 follow in order.
pub const OP_LITERAL_N1: u8 = 0x41;

/// COPY with 1-byte offset and 1-byte length; the other 15 follow.
pub const OP_COPY_N1_N1: u8 = 0x45;

/// Last assigned opcode.
pub const OP_COPY_N8_N8: u8 = 0x54;

/// Longest literal expressible without a length parameter.
pub const MAX_IMMEDIATE_LITERAL: u64 = OP_LITERAL_64 as u64;

/// Largest opcode plus parameters: a COPY with two 8-byte fields.
pub const MAX_COMMAND_LEN: usize = 1 + 8 + 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommandKind {
    End,
    Literal,
    Copy,
    #[default]
    Reserved,
}

/// What one opcode means.
///
/// `immediate` is the literal length carried by the opcode itself (0 when
/// the length is a parameter). `len_1` and `len_2` are parameter widths in
/// bytes, 0 when absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prototype {
    pub kind: CommandKind,
    pub immediate: u8,
    pub len_1: u8,
    pub len_2: u8,
}

impl Prototype {
    /// Parameter bytes following the opcode.
    #[inline]
    pub fn param_len(&self) -> usize {
        usize::from(self.len_1) + usize::from(self.len_2)
    }
}

pub type CommandTable = [Prototype; 256];

/// Build the opcode table.
pub const fn build_command_table() -> CommandTable {
    let mut tbl = [Prototype {
        kind: CommandKind::Reserved,
        immediate: 0,
        len_1: 0,
        len_2: 0,
    }; 256];

    tbl[OP_END as usize] = Prototype {
        kind: CommandKind::End,
        immediate: 0,
        len_1: 0,
        len_2: 0,
    };

    // --- Immediate literals ---
    let mut op = OP_LITERAL_1;
    while op <= OP_LITERAL_64 {
        tbl[op as usize] = Prototype {
            kind: CommandKind::Literal,
            immediate: op,
            len_1: 0,
            len_2: 0,
        };
        op += 1;
    }

    // --- Literals with a length parameter ---
    let mut i = 0;
    while i < WIDTHS.len() {
        tbl[OP_LITERAL_N1 as usize + i] = Prototype {
            kind: CommandKind::Literal,
            immediate: 0,
            len_1: WIDTHS[i] as u8,
            len_2: 0,
        };
        i += 1;
    }

    // --- Copies: offset width major, length width minor ---
    let mut off = 0;
    while off < WIDTHS.len() {
        let mut len = 0;
        while len < WIDTHS.len() {
            tbl[OP_COPY_N1_N1 as usize + off * WIDTHS.len() + len] = Prototype {
                kind: CommandKind::Copy,
                immediate: 0,
                len_1: WIDTHS[off] as u8,
                len_2: WIDTHS[len] as u8,
            };
            len += 1;
        }
        off += 1;
    }

    tbl
}

/// The opcode table, shared by every decoder.
pub static COMMAND_TABLE: CommandTable = build_command_table();

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// One decoded delta command, minus literal payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `len` bytes from the delta stream.
    Literal { len: u64 },
    /// `len` bytes from the basis starting at `offset`.
    Copy { offset: u64, len: u64 },
}

impl Instruction {
    /// Bytes of output this instruction produces.
    pub fn output_len(&self) -> u64 {
        match *self {
            Self::Literal { len } | Self::Copy { len, .. } => len,
        }
    }
}

/// Append the command header of a `len`-byte literal (`len > 0`). Returns
/// the number of header bytes written.
pub fn encode_literal(out: &mut Vec<u8>, len: u64) -> usize {
    debug_assert!(len > 0);
    if len <= MAX_IMMEDIATE_LITERAL {
        out.push(len as u8);
        return 1;
    }
    let width = netint::int_len(len);
    out.push(OP_LITERAL_N1 + netint::width_index(width) as u8);
    netint::put_be(out, len, width);
    1 + width
}

/// Append a COPY command (`len > 0`). Returns the bytes written.
pub fn encode_copy(out: &mut Vec<u8>, offset: u64, len: u64) -> usize {
    debug_assert!(len > 0);
    let off_width = netint::int_len(offset);
    let len_width = netint::int_len(len);
    let op = OP_COPY_N1_N1 as usize
        + netint::width_index(off_width) * WIDTHS.len()
        + netint::width_index(len_width);
    out.push(op as u8);
    netint::put_be(out, offset, off_width);
    netint::put_be(out, len, len_width);
    1 + off_width + len_width
}

pub fn encode_end(out: &mut Vec<u8>) {
    out.push(OP_END);
}

/// Decode the instruction for `op` given exactly `params.len()` parameter
/// bytes. `None` for END.
pub fn decode_params(op: u8, params: &[u8]) -> Result<Option<Instruction>> {
    let proto = COMMAND_TABLE[op as usize];
    debug_assert_eq!(params.len(), proto.param_len());
    let (p1, p2) = params.split_at(usize::from(proto.len_1));
    match proto.kind {
        CommandKind::End => Ok(None),
        CommandKind::Literal if proto.immediate > 0 => Ok(Some(Instruction::Literal {
            len: u64::from(proto.immediate),
        })),
        CommandKind::Literal => {
            let len = netint::get_be(p1);
            if len == 0 {
                return Err(Error::corrupt("zero-length literal"));
            }
            Ok(Some(Instruction::Literal { len }))
        }
        CommandKind::Copy => {
            let offset = netint::get_be(p1);
            let len = netint::get_be(p2);
            if len == 0 {
                return Err(Error::corrupt(format!("zero-length copy at offset {offset}")));
            }
            Ok(Some(Instruction::Copy { offset, len }))
        }
        CommandKind::Reserved => Err(Error::corrupt(format!("reserved opcode {op:#04x}"))),
    }
}

// ---------------------------------------------------------------------------
// In-memory walk
// ---------------------------------------------------------------------------

/// Walks the commands of a complete in-memory delta.
///
/// Yields each instruction until END; a truncated stream or a bad opcode
/// yields one error and then ends.
pub struct InstructionIter<'a> {
    rest: &'a [u8],
    done: bool,
}

impl<'a> InstructionIter<'a> {
    /// Check the header and position at the first command.
    pub fn new(delta: &'a [u8]) -> Result<Self> {
        let Some((head, rest)) = delta.split_first_chunk::<DELTA_HEADER_LEN>() else {
            return Err(Error::corrupt("delta shorter than its header"));
        };
        check_delta_header(head)?;
        Ok(Self { rest, done: false })
    }

    fn step(&mut self) -> Result<Option<Instruction>> {
        let Some((&op, rest)) = self.rest.split_first() else {
            return Err(Error::corrupt("delta ends without END command"));
        };
        let need = COMMAND_TABLE[op as usize].param_len();
        if rest.len() < need {
            return Err(Error::corrupt(format!(
                "command {op:#04x} truncated: {} of {need} parameter bytes",
                rest.len()
            )));
        }
        let (params, rest) = rest.split_at(need);
        let inst = decode_params(op, params)?;
        self.rest = rest;

        if let Some(Instruction::Literal { len }) = inst {
            let len = usize::try_from(len)
                .ok()
                .filter(|&l| l <= self.rest.len())
                .ok_or_else(|| Error::corrupt(format!("literal of {len} bytes truncated")))?;
            self.rest = &self.rest[len..];
        }
        Ok(inst)
    }
}

impl Iterator for InstructionIter<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(inst)) => Some(Ok(inst)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::header::encode_delta_header;

    #[test]
    fn table_layout() {
        let tbl = build_command_table();
        assert_eq!(tbl[0].kind, CommandKind::End);
        for op in 0x01..=0x40u8 {
            assert_eq!(tbl[op as usize].kind, CommandKind::Literal);
            assert_eq!(tbl[op as usize].immediate, op);
            assert_eq!(tbl[op as usize].param_len(), 0);
        }
        assert_eq!(tbl[0x44].len_1, 8);
        assert_eq!(tbl[0x45], Prototype {
            kind: CommandKind::Copy,
            immediate: 0,
            len_1: 1,
            len_2: 1,
        });
        assert_eq!((tbl[0x4A].len_1, tbl[0x4A].len_2), (2, 2));
        assert_eq!(tbl[OP_COPY_N8_N8 as usize].param_len(), 16);
        assert!(tbl[0x55..].iter().all(|p| p.kind == CommandKind::Reserved));
    }

    #[test]
    fn literal_headers_pick_narrowest_form() {
        let mut out = Vec::new();
        assert_eq!(encode_literal(&mut out, 1), 1);
        assert_eq!(encode_literal(&mut out, 64), 1);
        assert_eq!(encode_literal(&mut out, 65), 2);
        assert_eq!(encode_literal(&mut out, 300), 3);
        assert_eq!(out, [0x01, 0x40, 0x41, 65, 0x42, 0x01, 0x2C]);
    }

    #[test]
    fn copy_opcodes() {
        let mut out = Vec::new();
        assert_eq!(encode_copy(&mut out, 0, 16), 3);
        assert_eq!(out, [0x45, 0x00, 0x10]);

        out.clear();
        encode_copy(&mut out, 0x1_0000, 2048);
        // 4-byte offset, 2-byte length.
        assert_eq!(out[0], 0x45 + 4 * 2 + 1);
        assert_eq!(&out[1..], [0, 1, 0, 0, 0x08, 0x00]);

        out.clear();
        encode_copy(&mut out, u64::MAX, u64::MAX);
        assert_eq!(out[0], OP_COPY_N8_N8);
        assert_eq!(out.len(), MAX_COMMAND_LEN);
    }

    #[test]
    fn decode_rejects_reserved_and_zero_lengths() {
        assert!(matches!(decode_params(0x55, &[]), Err(Error::CorruptInput(_))));
        assert!(matches!(decode_params(0xFF, &[]), Err(Error::CorruptInput(_))));
        assert!(matches!(decode_params(0x45, &[3, 0]), Err(Error::CorruptInput(_))));
        assert!(matches!(decode_params(0x41, &[0]), Err(Error::CorruptInput(_))));
        assert_eq!(decode_params(0x00, &[]).unwrap(), None);
    }

    #[test]
    fn iterates_a_small_delta() {
        let mut d = Vec::new();
        encode_delta_header(&mut d);
        encode_copy(&mut d, 32, 16);
        encode_literal(&mut d, 3);
        d.extend_from_slice(b"xyz");
        encode_end(&mut d);

        let insts: Vec<Instruction> = InstructionIter::new(&d)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(insts, vec![
            Instruction::Copy { offset: 32, len: 16 },
            Instruction::Literal { len: 3 },
        ]);
    }

    #[test]
    fn truncated_literal_is_an_error() {
        let mut d = Vec::new();
        encode_delta_header(&mut d);
        encode_literal(&mut d, 10);
        d.extend_from_slice(b"short");
        let mut it = InstructionIter::new(&d).unwrap();
        assert!(matches!(it.next(), Some(Err(Error::CorruptInput(_)))));
        assert!(it.next().is_none());
    }

    #[test]
    fn missing_end_is_an_error() {
        let mut d = Vec::new();
        encode_delta_header(&mut d);
        encode_copy(&mut d, 0, 1);
        let results: Vec<_> = InstructionIter::new(&d).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }
}
