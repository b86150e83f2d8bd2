use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MuonError {
    #[error("Invalid global muon parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required global muon parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown tracker pattern-recognition builder: {0}")]
    UnknownPatternBuilder(String),

    #[error("Track re-fit did not converge: {0}")]
    RefitDidNotConverge(String),

    #[error("Pattern-recognition builder requested before initialization")]
    UninitializedBuilder,
}

impl PartialEq for MuonError {
    fn eq(&self, other: &Self) -> bool {
        use MuonError::*;
        match (self, other) {
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (MissingParameter(a), MissingParameter(b)) => a == b,
            (UnknownPatternBuilder(a), UnknownPatternBuilder(b)) => a == b,

            // The collaborator message is free text: same variant is enough
            (RefitDidNotConverge(_), RefitDidNotConverge(_)) => true,

            (UninitializedBuilder, UninitializedBuilder) => true,

            _ => false,
        }
    }
}
