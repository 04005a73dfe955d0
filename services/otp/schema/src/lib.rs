pub mod otp_records;
pub mod users;
