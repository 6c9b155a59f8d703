mod http_transport;
mod notion_upstream;

pub use http_transport::HttpTransport;
pub use notion_upstream::PreparedNotionUpstream;
