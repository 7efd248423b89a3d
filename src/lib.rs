//! Prowl: a policy-driven exploratory tester for web applications.
//!
//! Prowl drives a live web application through a sequence of simulated user
//! interactions chosen by a trainable policy, watches the page for
//! crash-class failures (severe console errors, unhandled exceptions in the
//! DOM), and turns every exploration episode into replayable scripts in two
//! dialects so any failure it finds can be reproduced by hand.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod browser;
pub mod config;
pub mod env;
pub mod generator;
pub mod logging;
pub mod policy;
pub mod runner;
pub mod script;
