// `raffle` command-line front end: argument parsing and command dispatch.

pub mod cli;
pub mod commands;
