use thiserror::Error;

/// Errors produced while building or stepping a particle simulation.
///
/// Setup variants are fatal: initialization aborts and everything built so far
/// is dropped. `Frame` is per-tick and is handed back to the frame driver.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid initialization parameters. Raised before any device resource exists.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A single shader stage failed to compile.
    #[error("could not compile shader \"{stage}\"\n{diagnostic}")]
    ShaderCompile { stage: String, diagnostic: String },

    /// Stages compiled but could not be combined into an executable program.
    #[error("could not link program \"{program}\"\n{diagnostic}")]
    ProgramLink { program: String, diagnostic: String },

    /// Attribute layout cannot be expressed or does not match the program input.
    #[error("invalid buffer layout for \"{array}\": {reason}")]
    Layout { array: String, reason: String },

    /// The adapter lacks a feature the simulation depends on.
    #[error("device lacks required capability: {0}")]
    DeviceCapability(String),

    /// A device error while producing a frame.
    #[error("frame failed: {0}")]
    Frame(String),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn layout(array: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Layout {
            array: array.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn link(program: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::ProgramLink {
            program: program.into(),
            diagnostic: diagnostic.into(),
        }
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;
