pub mod dashboard;
pub mod observation;
