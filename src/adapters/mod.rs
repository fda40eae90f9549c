//! External integrations
//!
//! Adapters sit at the boundary between the pipeline core and the outside
//! world: the tabular source that supplies raw records and the FHIR server
//! that receives them.

pub mod fhir;
pub mod source;
