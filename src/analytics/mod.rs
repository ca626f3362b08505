//! Analytics over topic sequences and schedules
//!
//! - [`conformance`] - expected vs actual subject shares
//! - [`spread`] - interleaving quality score

pub mod conformance;
pub mod spread;

pub use conformance::{
    AnalysisError, AnalysisResult, ConformanceAnalyzer, ConformanceReport, SubjectConformance,
};
pub use spread::{QualityLevel, SpreadAnalysis, SubjectSpread};
