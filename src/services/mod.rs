pub mod prescription_service;
pub mod response;
pub mod session_service;

pub use prescription_service::PrescriptionService;
pub use session_service::SessionService;
