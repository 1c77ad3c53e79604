pub mod reqwest_transport;

pub use self::reqwest_transport::ReqwestTransport;
