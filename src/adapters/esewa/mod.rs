//! eSewa ePay v2 integration: request signing, the browser form and
//! decoding of the base64 return payload.

pub mod callback;
pub mod form;
pub mod signature;
