// programs/quasar_pool/src/instructions/mod.rs

pub mod initialize;
pub mod pricing;
pub mod capital;
pub mod coverage;
pub mod claims;

pub use initialize::*;
pub use pricing::*;
pub use capital::*;
pub use coverage::*;
pub use claims::*;
