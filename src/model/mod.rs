pub mod action;
pub mod history;
pub mod siswa;
pub mod status;
