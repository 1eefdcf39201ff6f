// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexer module - offline artifact build command

pub mod build;
