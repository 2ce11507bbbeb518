//! Type definitions for provider-rank

mod error;
mod ranking;
mod records;

pub use error::*;
pub use ranking::*;
pub use records::*;

/// All four source collections of one pipeline run, decoded
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub appointments: Vec<Appointment>,
    pub providers: Vec<Provider>,
    pub links: Vec<PatientProviderLink>,
    pub ratings: Vec<Rating>,
}
