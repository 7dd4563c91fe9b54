// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: the wire boundary and the authenticated request pipeline.

pub mod exchange;
pub mod pipeline;
