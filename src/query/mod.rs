// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query module - search, serve and info commands

pub mod info;
pub mod search;
pub mod serve;
