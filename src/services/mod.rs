pub mod email;
pub mod hashing;
pub mod jwt;
pub mod otp;
pub mod roles;
pub mod totp;
