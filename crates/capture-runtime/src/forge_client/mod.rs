mod compound;
mod fine_grained;
mod hybrid;
mod transport;

pub use compound::CompoundClient;
pub use fine_grained::FineGrainedClient;
pub use hybrid::HybridForgeClient;
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
