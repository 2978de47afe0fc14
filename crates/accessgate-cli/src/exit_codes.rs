//! Exit codes for the `accessgate` binary. Scripts rely on these values.

pub const SUCCESS: i32 = 0;
pub const DENIED: i32 = 1; // Principal is in none of the required groups
pub const CONFIG_ERROR: i32 = 2; // Registry or oracle configuration invalid
pub const INFRA_ERROR: i32 = 3; // Membership oracle could not answer
