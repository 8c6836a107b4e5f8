pub mod appointments;
pub mod booking;
pub mod calls;
pub mod intent;
pub mod practice;
