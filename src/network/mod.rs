//! Network layer - request execution, proxy fallback and the proxy routes
//!
//! Everything here talks to the outside world through [`HttpTransport`], so
//! the executor and both route handlers run unchanged against a fake.

pub mod executor;
pub mod proxy;
pub mod spec_fetch;
pub mod transport;

pub use executor::RequestExecutor;
pub use proxy::{ProxyBody, ProxyFailure, ProxyHandler, ProxyRequestBody};
pub use spec_fetch::{fetch_spec_via_proxy, FetchedSpec, SpecFetcher};
pub use transport::{
    HttpTransport, ReqwestTransport, TransportError, TransportRequest, TransportResponse,
};
