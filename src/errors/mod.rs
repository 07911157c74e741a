mod emission_error;

pub use emission_error::*;
