//! HTTP request/response subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → request.rs (RequestDescriptor: endpoint, method, headers, body, query)
//!     → headers.rs (merge client-wide defaults: content type, auth)
//!     → transport.rs (one HTTP exchange → RawResponse | TransportError)
//!     → response.rs (ResponseEnvelope {data, error, status})
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so tests and hosts can inject their own
//! - HTTP error statuses are values, only "no response" is an error
//! - Every public call ends in an envelope, never a panic or bare error

pub mod headers;
pub mod request;
pub mod response;
pub mod transport;

pub use headers::DefaultHeaders;
pub use request::{Method, RequestDescriptor};
pub use response::{ErrorInfo, ErrorKind, ResponseEnvelope};
pub use transport::{HttpTransport, RawResponse, ResponseBody, Transport, TransportError};
