use std::{error::Error, fmt};

// Error value used by tests that drive the error path of a pipeline. The
// payload names the failing stage so assertion failures read well.
#[derive(Debug)]
pub struct SourceFailure(pub &'static str);

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source failed: {}", self.0)
    }
}

impl Error for SourceFailure {}
