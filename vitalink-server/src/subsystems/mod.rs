pub mod accounts;
pub mod clinician;
pub mod medications;
pub mod notify;
pub mod pulse;
pub mod vitals;
