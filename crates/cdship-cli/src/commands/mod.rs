pub mod deploy;
pub mod pack;
