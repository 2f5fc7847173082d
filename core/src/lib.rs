pub mod calendar;
pub mod db;
pub mod export;
pub mod models;
pub mod plan;
pub mod progression;
pub mod reminders;
pub mod service;
