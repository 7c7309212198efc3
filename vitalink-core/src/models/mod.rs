pub mod medication;
pub mod user;
pub mod vitals;

pub use medication::{AdherenceLogEntry, Medication, MedicationWithAdherence};
pub use user::{PatientProfile, User};
pub use vitals::{ConstellationEntry, VitalsPoint, VitalsReading};
