use serde::{Deserialize, Serialize};

/// The backend's current phase in producing a response to the latest
/// submission. Driven entirely by inbound events; never self-transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStage {
    #[default]
    Idle,
    ChoosingComponent,
    FetchingContext,
    HydratingComponent,
    StreamingResponse,
    Complete,
    Error,
}

impl GenerationStage {
    /// User-facing label for the loading indicator.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationStage::Idle => "Idle",
            GenerationStage::ChoosingComponent => "Choosing component",
            GenerationStage::FetchingContext => "Fetching context",
            GenerationStage::HydratingComponent => "Preparing component",
            GenerationStage::StreamingResponse => "Generating response",
            GenerationStage::Complete => "Complete",
            GenerationStage::Error => "Error",
        }
    }

    /// Terminal until the next submission resets to `Idle`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStage::Complete | GenerationStage::Error)
    }

    /// Busy = a response is in flight (not idle, not terminal).
    pub fn is_busy(&self) -> bool {
        !matches!(self, GenerationStage::Idle | GenerationStage::Complete | GenerationStage::Error)
    }

    /// Whether `next` is a legal successor. The pipeline is linear; any
    /// state may fail directly to `Error`; terminal states only reset to
    /// `Idle` (next submission).
    pub fn allows_transition_to(&self, next: GenerationStage) -> bool {
        use GenerationStage::*;
        if next == Error {
            return *self != Error;
        }
        matches!(
            (*self, next),
            (Idle, ChoosingComponent)
                | (ChoosingComponent, FetchingContext)
                | (FetchingContext, HydratingComponent)
                | (HydratingComponent, StreamingResponse)
                | (StreamingResponse, Complete)
                | (Complete, Idle)
                | (Error, Idle)
        )
    }
}
