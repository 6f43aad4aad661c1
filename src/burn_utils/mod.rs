pub mod distribution;
pub mod rand;
pub mod sequence;
pub use self::rand::*;
pub use self::sequence::*;
