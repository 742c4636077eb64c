pub mod aggregate;
pub mod calendar;
pub mod db_utils;
pub mod phone;
