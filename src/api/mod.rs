pub mod action;
pub mod dashboard;
pub mod history;
pub mod public;
pub mod recap;
pub mod siswa;
pub mod whatsapp;
