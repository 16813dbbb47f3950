//! Core utilities: calendar-day time management

pub mod calendar;
