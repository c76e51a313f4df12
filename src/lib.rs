//! magnifier library crate.
//!
//! A launcher process offers resolution profiles and supervises one
//! magnifier worker at a time; the worker crops the live camera image
//! around its center and scales it back up to fill the screen.
//!
//! This module exposes the components to the binary and to integration tests.

pub mod camera;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod launcher;
pub mod logging;
pub mod monitor;
pub mod present;
pub mod supervisor;
pub mod worker;
pub mod zoom;
