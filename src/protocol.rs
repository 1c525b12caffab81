//! Public HTTP response bodies (serde ready).
//! Problems themselves are served as `domain::Problem`, verbatim.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthOut {
    pub ok: bool,
}
