pub(crate) const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3001";
pub(crate) const DEFAULT_P2P_ADDR: &str = "127.0.0.1:5001";
pub(crate) const PEER_CONNECT_ATTEMPTS: u32 = 5;
