pub mod portal;
pub mod redirect;

pub use portal::{LandingSignature, PortalTopology};
pub use redirect::{
    header_redirect, image_beacon, scan_response, script_redirect, FailureMarker, PageScan,
};
