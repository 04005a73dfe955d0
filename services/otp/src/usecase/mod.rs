pub mod hashing;
pub mod issue;
pub mod purge;
pub mod resend;
pub mod verify;
