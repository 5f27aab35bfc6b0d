//! Command implementations

pub mod doctor;

pub mod info;

pub mod publish;

pub mod tags;
