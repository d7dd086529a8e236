//! # arm-script
//!
//! Interpreter and simulator for a classroom robot arm that stacks blocks.
//!
//! A user writes a short script (`position(3, 4)`, `hoehe(1)`, `pumpe_an()`,
//! ...). The [`parser`] turns it into a typed [`ScriptProgram`], the
//! [`geometry`] engine maps the grid cells onto the arm's workspace and keeps
//! the wrist within its servo limits, and the [`executor`] drives an
//! [`Actuator`] while recording every command in a simulated block world to
//! judge whether a [`ChallengeDefinition`] was solved.

pub mod actuator;
pub mod challenge;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod logging;
pub mod parser;
pub mod world;

pub use actuator::*;
pub use challenge::*;
pub use command::*;
pub use config::*;
pub use controller::*;
pub use error::*;
pub use executor::*;
pub use geometry::*;
pub use logging::*;
pub use parser::*;
pub use world::*;
