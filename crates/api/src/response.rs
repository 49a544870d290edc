//! Response envelope shared by the JSON handlers.
//!
//! Every JSON body is wrapped as `{ "data": ... }`.

use serde::Serialize;

/// Standard `{ "data": T }` envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
