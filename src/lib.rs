//! Mines the I-TASSER results queue: downloads finished job archives,
//! derives the predicted sequence of each job, and tabulates the results
//! for comparison against the human proteome.

pub mod app;
pub mod archive;
pub mod blast;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod interrupt;
pub mod itasser;
pub mod ledger;
pub mod output;
pub mod store;
pub mod structure;
pub mod tabulate;
