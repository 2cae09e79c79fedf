use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantformError {
    #[error("Parse error at {position} in '{input}': {message}")]
    Parse {
        input: String,
        position: usize,
        message: String,
    },

    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Predecessor must be exactly one module, got {0}")]
    PredecessorArity(usize),

    #[error("Undefined name '{0}'")]
    UndefinedName(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PlantformError {
    pub fn parse(input: &str, position: usize, message: impl Into<String>) -> Self {
        PlantformError::Parse {
            input: input.to_string(),
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlantformError>;
