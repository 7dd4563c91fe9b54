// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps recorded operation kinds onto their wire requests.
//!
//! Direct sends and queue replay both route through [`request_for`], so an
//! operation hits the same endpoint no matter when it is delivered.

use crate::error::ApiError;
use crate::transport::pipeline::ApiRequest;

pub const UPDATE_FARMER: &str = "UPDATE_FARMER";
pub const CREATE_DELIVERY: &str = "CREATE_DELIVERY";
pub const UPDATE_CONTRACT: &str = "UPDATE_CONTRACT";
pub const ACKNOWLEDGE_ALERT: &str = "ACKNOWLEDGE_ALERT";

/// Build the wire request for a recorded mutation.
///
/// An unknown kind is a `Validation` failure; the replay path reports it and
/// keeps the operation queued instead of dropping it.
pub fn request_for(kind: &str, payload: &serde_json::Value) -> Result<ApiRequest, ApiError> {
    match kind {
        UPDATE_FARMER => {
            let id = require_id(payload)?;
            Ok(ApiRequest::put(format!("/farmers/{id}"), payload.clone()))
        }
        CREATE_DELIVERY => Ok(ApiRequest::post("/deliveries", payload.clone())),
        UPDATE_CONTRACT => {
            let id = require_id(payload)?;
            Ok(ApiRequest::put(format!("/contracts/{id}"), payload.clone()))
        }
        ACKNOWLEDGE_ALERT => {
            let id = require_id(payload)?;
            Ok(ApiRequest::post(format!("/alerts/{id}/acknowledge"), payload.clone()))
        }
        other => Err(ApiError::Validation {
            message: format!("unknown operation kind: {other}"),
            fields: None,
        }),
    }
}

fn require_id(payload: &serde_json::Value) -> Result<&str, ApiError> {
    payload.get("id").and_then(|v| v.as_str()).ok_or_else(|| ApiError::Validation {
        message: "operation payload missing id".to_owned(),
        fields: None,
    })
}
