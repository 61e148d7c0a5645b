//! Integration tests for the sos offline repository engine

mod cli_contracts;
mod end_to_end;
mod support;
mod tracking_modes;
mod update_merge;
