pub mod activities;
pub mod bootstrap;
pub mod contracts;
pub mod engine;
pub mod ports;
pub mod runtime;
pub mod workflows;
