// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fieldsync: offline-resilient data access for the coop's field app.

pub mod api;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod session;
pub mod storage;
pub mod sync;
pub mod test_support;
pub mod transport;
