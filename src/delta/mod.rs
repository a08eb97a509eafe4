// Delta encoding and patching.
//
// - `encoder`: DeltaJob: signature + new bytes → delta stream
// - `pipeline`: command emission with copy coalescing
// - `decoder`: PatchJob: basis + delta stream → new bytes
// - `basis`: positioned reads from the patch basis

pub mod basis;
pub mod decoder;
pub mod encoder;
pub mod pipeline;

pub use basis::{Basis, SeekBasis};
pub use decoder::PatchJob;
pub use encoder::DeltaJob;
pub use pipeline::MAX_LITERAL_RUN;
