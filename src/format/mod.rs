// Wire formats for signature and delta streams.
//
// - `netint`: big-endian integers of width 1/2/4/8
// - `header`: magic numbers and the signature header
// - `command`: delta opcode table, command encoding, in-memory walk

pub mod command;
pub mod header;
pub mod netint;

pub use command::{Instruction, InstructionIter};
pub use header::{DELTA_MAGIC, SIG_MAGIC, SignatureHeader};
