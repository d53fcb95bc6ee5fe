//! Token lifecycle: signed claims codec, issuance, and validation.
//!
//! Tokens are stateless HS256 JWTs over a single shared secret established at
//! startup. The codec is the only component that touches signing keys; the
//! issuer and validator compose it.

mod claims;
mod issuer;
mod validator;

pub use claims::{Claims, ClaimsCodec, CodecError};
pub use issuer::TokenIssuer;
pub use validator::TokenValidator;
