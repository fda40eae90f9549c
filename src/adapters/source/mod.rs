//! Tabular source adapter
//!
//! Supplies the ordered sequence of raw records the pipeline consumes.
//! Failure to open or parse the source is a fatal configuration-time error;
//! the pipeline does not start.

pub mod csv;

pub use self::csv::CsvSource;
