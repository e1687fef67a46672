pub mod cert;
pub mod gate;
pub mod omega;
pub mod zea;
