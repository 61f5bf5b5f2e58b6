pub mod bwt;
pub mod fm;
pub mod genome;
pub mod sa;
