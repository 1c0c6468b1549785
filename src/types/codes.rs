//! JSON-RPC error codes.
//!
//! The first five are the JSON-RPC 2.0 standard codes. The remaining
//! codes sit in the implementation-defined server error range and flag
//! envelope problems with no standard code.

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// The request id is not a string, an integer or null.
pub const INVALID_ID: i64 = -32000;
/// The request `method` member is not a string.
pub const INVALID_METHOD: i64 = -32001;
/// The request uses a JSON-RPC feature this server does not implement, i.e.
/// batches.
pub const NOT_IMPLEMENTED: i64 = -32002;

/// The only protocol version accepted in the `jsonrpc` member.
pub const JSONRPC_VERSION: &str = "2.0";
