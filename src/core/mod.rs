//! Core Infrastructure
//!
//! HTTP transport seam and anti-CSRF request correlation.

pub mod correlation;
pub mod transport;

pub use correlation::RequestCorrelation;
pub use transport::{
    HttpExchanger, HttpMethod, HttpRequest, HttpResponse, MockHttpExchanger, ReqwestHttpExchanger,
};
