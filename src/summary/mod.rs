//! Grouped summary statistics over the cleaned table.
//!
//! Records are grouped by one or more dimensions (Track, Cohort, Income
//! status) and each group gets its count, subject means, attendance rate,
//! pass rate and the attendance/project-score correlation.

pub mod aggregate;
pub mod types;
pub mod utility;
