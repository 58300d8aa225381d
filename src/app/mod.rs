// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod mark_interactor;
pub mod verify_interactor;

// Re-export interactors
pub use inspect_interactor::{InspectInteractor, InspectRequest, ReportFormat};
pub use mark_interactor::{MarkInteractor, MarkRequest};
pub use verify_interactor::{VerifyInteractor, VerifyRequest};
