pub mod http;
pub mod tcp;
pub mod traits;

pub use http::HttpTransport;
pub use tcp::TcpProbe;
pub use traits::{Reply, ReplyClass, ServerTransport, TransportError};
